//! Artifact URL construction for job config templates.
//!
//! Tasks fetch rendered config templates over HTTP at launch. The URL is
//! assembled by literal concatenation: no encoding and no slash
//! normalization, because existing clients depend on the exact strings
//! produced here. Slashes in a job name therefore end up in the path
//! verbatim.
//! TODO(artifacts): decide whether to disallow slashes in job names.

use uuid::Uuid;

/// Domain serving L4 virtual-IP endpoints for scheduler APIs.
const VIP_DOMAIN: &str = "marathon.l4lb.thisdcos.directory";

/// Builds the URL a task uses to fetch one rendered config template.
#[must_use]
pub fn job_template_url(
    service_name: &str,
    job_name: &str,
    template_id: &Uuid,
    pod_type: &str,
    task_name: &str,
    config_name: &str,
) -> String {
    format!(
        "http://{}/v1/jobs/{}/artifacts/template/{}/{}/{}/{}",
        vip_host(service_name),
        job_name,
        template_id,
        pod_type,
        task_name,
        config_name
    )
}

/// The virtual-IP hostname for a service's API.
///
/// Slashes are stripped from the service name because they cannot appear
/// in a hostname; nested service names thus collapse into one label.
fn vip_host(service_name: &str) -> String {
    format!("api.{}.{}", service_name.replace('/', ""), VIP_DOMAIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_url() {
        let id = Uuid::new_v4();
        assert_eq!(
            format!(
                "http://api.svc-name.marathon.l4lb.thisdcos.directory/v1/jobs/job-name/artifacts/template/{id}/some-pod/some-task/some-config"
            ),
            job_template_url("svc-name", "job-name", &id, "some-pod", "some-task", "some-config")
        );
    }

    #[test]
    fn test_template_url_with_slashes() {
        // Slashes vanish from the host but survive in the path verbatim.
        let id = Uuid::new_v4();
        assert_eq!(
            format!(
                "http://api.pathtosvc-name.marathon.l4lb.thisdcos.directory/v1/jobs//path/to/job-name/artifacts/template/{id}/some-pod/some-task/some-config"
            ),
            job_template_url(
                "/path/to/svc-name",
                "/path/to/job-name",
                &id,
                "some-pod",
                "some-task",
                "some-config"
            )
        );
    }
}

//! API endpoint URL builders
//!
//! Path segments come from user data (sub-region names contain spaces), so
//! every segment is percent-encoded.

use urlencoding::encode;

fn api(base_url: &str) -> String {
    format!("{}/api/v1", base_url.trim_end_matches('/'))
}

pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base_url.trim_end_matches('/'))
}

pub fn allocate_url(base_url: &str, region: &str, sub_region: &str) -> String {
    format!(
        "{}/bundle-counters/{}/{}/allocate",
        api(base_url),
        encode(region),
        encode(sub_region)
    )
}

pub fn recycle_url(base_url: &str, region: &str, sub_region: &str) -> String {
    format!(
        "{}/bundle-counters/{}/{}/recycle",
        api(base_url),
        encode(region),
        encode(sub_region)
    )
}

pub fn counters_url(base_url: &str, region: Option<&str>) -> String {
    match region {
        Some(r) => format!("{}/bundle-counters?region={}", api(base_url), encode(r)),
        None => format!("{}/bundle-counters", api(base_url)),
    }
}

pub fn user_state_url(base_url: &str, worker_id: &str) -> String {
    format!("{}/user-states/{}", api(base_url), encode(worker_id))
}

pub fn active_bundle_url(base_url: &str, worker_id: &str, sub_region: &str) -> String {
    format!(
        "{}/user-states/{}/active-bundles/{}",
        api(base_url),
        encode(worker_id),
        encode(sub_region)
    )
}

pub fn signals_url(base_url: &str, worker_id: &str) -> String {
    format!("{}/signals/{}", api(base_url), encode(worker_id))
}

pub fn signal_url(base_url: &str, worker_id: &str, sub_region: &str) -> String {
    format!(
        "{}/signals/{}/{}",
        api(base_url),
        encode(worker_id),
        encode(sub_region)
    )
}

pub fn datasets_url(base_url: &str, region: &str) -> String {
    format!("{}/datasets/{}", api(base_url), encode(region))
}

pub fn dataset_by_name_url(base_url: &str, region: &str, name: &str) -> String {
    format!(
        "{}/datasets/{}/by-name/{}",
        api(base_url),
        encode(region),
        encode(name)
    )
}

pub fn dataset_url(base_url: &str, region: &str, id: &str) -> String {
    format!("{}/datasets/{}/{}", api(base_url), encode(region), encode(id))
}

pub fn processed_record_url(
    base_url: &str,
    region: &str,
    sub_region: &str,
    bundle_number: u32,
    unique_id: &str,
) -> String {
    format!(
        "{}/processed-records/{}/{}/{}/{}",
        api(base_url),
        encode(region),
        encode(sub_region),
        bundle_number,
        encode(unique_id)
    )
}

pub fn export_url(base_url: &str, region: &str) -> String {
    format!("{}/processed-records/{}/export", api(base_url), encode(region))
}

/// `action` is one of the admin route names, e.g. `reset-progress`.
pub fn admin_url(base_url: &str, action: &str) -> String {
    format!("{}/admin/{}", api(base_url), action)
}

pub fn users_url(base_url: &str, region: Option<&str>) -> String {
    match region {
        Some(r) => format!("{}/users?region={}", api(base_url), encode(r)),
        None => format!("{}/users", api(base_url)),
    }
}

pub fn user_url(base_url: &str, id: &str) -> String {
    format!("{}/users/{}", api(base_url), encode(id))
}

pub fn summary_url(base_url: &str, region: Option<&str>) -> String {
    match region {
        Some(r) => format!("{}/analytics/summary?region={}", api(base_url), encode(r)),
        None => format!("{}/analytics/summary", api(base_url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_url_encodes_sub_region() {
        assert_eq!(
            allocate_url("http://localhost:8000/", "chhatrapati-sambhajinagar", "Chhatrapati Sambhajinagar"),
            "http://localhost:8000/api/v1/bundle-counters/chhatrapati-sambhajinagar/Chhatrapati%20Sambhajinagar/allocate"
        );
    }

    #[test]
    fn test_processed_record_url() {
        assert_eq!(
            processed_record_url("http://localhost:8000", "ahilyanagar", "Sillod", 3, "AHSI512"),
            "http://localhost:8000/api/v1/processed-records/ahilyanagar/Sillod/3/AHSI512"
        );
    }

    #[test]
    fn test_optional_region_filter() {
        assert_eq!(
            summary_url("http://localhost:8000", None),
            "http://localhost:8000/api/v1/analytics/summary"
        );
        assert_eq!(
            users_url("http://localhost:8000", Some("ahilyanagar")),
            "http://localhost:8000/api/v1/users?region=ahilyanagar"
        );
    }

    #[test]
    fn test_health_url() {
        assert_eq!(health_url("http://localhost:8000"), "http://localhost:8000/health");
    }
}

//! Label derivation for a single envelope.

use nozzle_domain::{Envelope, Event, LabelSet};
use nozzle_ports::AppInfoDirectoryPort;
use std::sync::Arc;

/// Label key for the emitting component.
pub const LABEL_ORIGIN: &str = "origin";
/// Label key for the event type.
pub const LABEL_EVENT_TYPE: &str = "eventType";
/// Label key for the job name.
pub const LABEL_JOB: &str = "job";
/// Label key for the job index.
pub const LABEL_INDEX: &str = "index";
/// Label key for the application id.
pub const LABEL_APPLICATION_ID: &str = "applicationId";
/// Label key for the application name.
pub const LABEL_APP_NAME: &str = "appName";
/// Label key for the space name.
pub const LABEL_SPACE_NAME: &str = "spaceName";
/// Label key for the space guid.
pub const LABEL_SPACE_GUID: &str = "spaceGuid";
/// Label key for the org name.
pub const LABEL_ORG_NAME: &str = "orgName";
/// Label key for the org guid.
pub const LABEL_ORG_GUID: &str = "orgGuid";

/// Builds the label set attached to every metric derived from an envelope.
///
/// `deployment` and `ip` are never labels. When the payload carries an
/// application id, `applicationId` is always set and the five app-metadata
/// labels are added only if the directory resolves the id.
#[derive(Clone)]
pub struct LabelMaker {
    app_info: Arc<dyn AppInfoDirectoryPort>,
}

impl LabelMaker {
    /// Label maker backed by `app_info`.
    #[must_use]
    pub fn new(app_info: Arc<dyn AppInfoDirectoryPort>) -> Self {
        Self { app_info }
    }

    /// Labels for `envelope`.
    pub fn build(&self, envelope: &Envelope) -> LabelSet {
        let mut labels = LabelSet::new();

        insert_non_empty(&mut labels, LABEL_ORIGIN, envelope.origin.as_deref());
        labels.insert(
            LABEL_EVENT_TYPE.to_string(),
            envelope.event_type().as_str().to_string(),
        );
        insert_non_empty(&mut labels, LABEL_JOB, envelope.job.as_deref());
        insert_non_empty(&mut labels, LABEL_INDEX, envelope.index.as_deref());

        if let Some(app_id) = application_id(&envelope.event).filter(|id| !id.is_empty()) {
            self.insert_app_labels(&mut labels, &app_id);
            labels.insert(LABEL_APPLICATION_ID.to_string(), app_id);
        }

        labels
    }

    fn insert_app_labels(&self, labels: &mut LabelSet, app_id: &str) {
        let info = self.app_info.lookup(app_id);
        if info.is_empty() {
            return;
        }
        labels.insert(LABEL_APP_NAME.to_string(), info.app_name);
        labels.insert(LABEL_SPACE_NAME.to_string(), info.space_name);
        labels.insert(LABEL_SPACE_GUID.to_string(), info.space_guid);
        labels.insert(LABEL_ORG_NAME.to_string(), info.org_name);
        labels.insert(LABEL_ORG_GUID.to_string(), info.org_guid);
    }
}

fn insert_non_empty(labels: &mut LabelSet, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        labels.insert(key.to_string(), value.to_string());
    }
}

/// Application id carried by the payload, if the event type has one.
fn application_id(event: &Event) -> Option<String> {
    match event {
        Event::HttpStartStop(http) => http.application_id.map(|id| id.to_guid_string()),
        Event::LogMessage(log) => log.app_id.clone(),
        Event::ContainerMetric(container) => container.application_id.clone(),
        Event::ValueMetric(_) | Event::CounterEvent(_) | Event::Error(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nozzle_domain::{
        AppInfo, ContainerMetric, CounterEvent, ErrorEvent, HttpStartStop, LogMessage,
        UuidHalves, ValueMetric,
    };
    use std::collections::BTreeMap;

    const APP_GUID: &str = "f47ac10b-58cc-4372-a567-0e02b2c3d479";

    struct FixedDirectory(BTreeMap<String, AppInfo>);

    impl AppInfoDirectoryPort for FixedDirectory {
        fn lookup(&self, app_guid: &str) -> AppInfo {
            self.0.get(app_guid).cloned().unwrap_or_default()
        }
    }

    fn my_app() -> AppInfo {
        AppInfo {
            app_name: "MyApp".to_string(),
            space_name: "MySpace".to_string(),
            space_guid: "2ab560c3-3f21-45e0-9452-d748ff3a15e9".to_string(),
            org_name: "MyOrg".to_string(),
            org_guid: "b494fb47-3c44-4a98-9a08-d839ec5c799b".to_string(),
        }
    }

    fn maker_with(apps: &[(&str, AppInfo)]) -> LabelMaker {
        let apps = apps
            .iter()
            .map(|(guid, info)| ((*guid).to_string(), info.clone()))
            .collect();
        LabelMaker::new(Arc::new(FixedDirectory(apps)))
    }

    fn keys(labels: &LabelSet) -> Vec<&str> {
        labels.keys().map(String::as_str).collect()
    }

    #[test]
    fn header_fields_become_labels_and_deployment_ip_never_do() {
        let envelope = Envelope::new(1, Event::ValueMetric(ValueMetric::default()))
            .with_origin("rep")
            .with_job("diego_cell")
            .with_index("3")
            .with_deployment("cf")
            .with_ip("10.0.0.1");

        let labels = maker_with(&[]).build(&envelope);
        assert_eq!(keys(&labels), ["eventType", "index", "job", "origin"]);
        assert_eq!(labels.get("eventType").map(String::as_str), Some("ValueMetric"));
        assert_eq!(labels.get("index").map(String::as_str), Some("3"));
    }

    #[test]
    fn empty_and_missing_header_fields_are_omitted() {
        let envelope = Envelope::new(1, Event::CounterEvent(CounterEvent::default()))
            .with_origin("")
            .with_job("");

        let labels = maker_with(&[]).build(&envelope);
        assert_eq!(keys(&labels), ["eventType"]);
    }

    #[test]
    fn resolved_application_adds_metadata_labels() {
        let envelope = Envelope::new(
            1,
            Event::LogMessage(LogMessage {
                app_id: Some(APP_GUID.to_string()),
                ..LogMessage::default()
            }),
        );

        let labels = maker_with(&[(APP_GUID, my_app())]).build(&envelope);
        assert_eq!(labels.get("applicationId").map(String::as_str), Some(APP_GUID));
        assert_eq!(labels.get("appName").map(String::as_str), Some("MyApp"));
        assert_eq!(labels.get("spaceName").map(String::as_str), Some("MySpace"));
        assert_eq!(labels.get("orgName").map(String::as_str), Some("MyOrg"));
        assert_eq!(labels.len(), 7);
    }

    #[test]
    fn unresolved_application_keeps_only_the_id() {
        let envelope = Envelope::new(
            1,
            Event::ContainerMetric(ContainerMetric {
                application_id: Some(APP_GUID.to_string()),
                ..ContainerMetric::default()
            }),
        );

        let labels = maker_with(&[]).build(&envelope);
        assert_eq!(keys(&labels), ["applicationId", "eventType"]);
    }

    #[test]
    fn http_application_id_is_formatted_from_uuid_halves() {
        let envelope = Envelope::new(
            1,
            Event::HttpStartStop(HttpStartStop {
                application_id: Some(UuidHalves::new(0x7243_cc58_0bc1_7af4, 0x79d4_c3b2_020e_67a5)),
                ..HttpStartStop::default()
            }),
        );

        let labels = maker_with(&[(APP_GUID, my_app())]).build(&envelope);
        assert_eq!(labels.get("applicationId").map(String::as_str), Some(APP_GUID));
        assert_eq!(labels.get("appName").map(String::as_str), Some("MyApp"));
    }

    #[test]
    fn events_without_application_ids_never_query_metadata() {
        for event in [
            Event::ValueMetric(ValueMetric::default()),
            Event::CounterEvent(CounterEvent::default()),
            Event::Error(ErrorEvent::default()),
            Event::LogMessage(LogMessage::default()),
            Event::HttpStartStop(HttpStartStop::default()),
        ] {
            let labels = maker_with(&[("", my_app())]).build(&Envelope::new(1, event));
            assert!(!labels.contains_key("applicationId"));
            assert!(!labels.contains_key("appName"));
        }
    }
}

//! Reference data (staff and student directories) for the intake forms.

use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::api::GuestbookApi;
use crate::model::{DirectoryOption, EntityId, StudentOption};

/// Body of `GET /guestbook/data`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceDataResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<ReferencePayload>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Lists are kept as raw JSON so a malformed list degrades to empty
/// instead of failing the whole response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferencePayload {
    #[serde(default)]
    pub siswa: Value,
    #[serde(default)]
    pub pegawai: Value,
}

#[derive(Debug, Deserialize)]
struct RawStaff {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    nama_pegawai: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStudent {
    #[serde(default)]
    value: Value,
    #[serde(default)]
    idsiswa: Value,
    #[serde(default)]
    label: Value,
    #[serde(default)]
    namasiswa: Value,
    #[serde(default)]
    nis: Value,
    #[serde(default)]
    nisn: Value,
    #[serde(default)]
    kelas: Value,
}

/// Option lists for the select controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
    pub staff: Vec<DirectoryOption>,
    pub students: Vec<StudentOption>,
}

impl ReferenceData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize a response. A response without the success flag yields
    /// empty lists.
    pub fn from_response(response: ReferenceDataResponse) -> Self {
        if !response.success {
            warn!(
                "Reference data request unsuccessful: {}",
                response.message.as_deref().unwrap_or("no message")
            );
            return Self::empty();
        }

        let Some(payload) = response.data else {
            warn!("Reference data response has no data section");
            return Self::empty();
        };

        Self {
            staff: normalize_list(&payload.pegawai, "pegawai", staff_option),
            students: normalize_list(&payload.siswa, "siswa", student_option),
        }
    }

    pub fn find_student(&self, id: &EntityId) -> Option<&StudentOption> {
        self.students.iter().find(|s| &s.value == id)
    }
}

/// Fetch and normalize reference data. Never fails: any error is logged
/// and the form continues with empty option lists.
pub fn load_reference_data(api: &dyn GuestbookApi) -> ReferenceData {
    match api.fetch_reference_data() {
        Ok(response) => {
            let data = ReferenceData::from_response(response);
            info!(
                "Loaded reference data: {} staff, {} students",
                data.staff.len(),
                data.students.len()
            );
            data
        }
        Err(e) => {
            error!("Failed to load reference data: {}", e);
            ReferenceData::empty()
        }
    }
}

fn normalize_list<T>(list: &Value, name: &str, convert: fn(&Value) -> Option<T>) -> Vec<T> {
    let Some(entries) = list.as_array() else {
        if !list.is_null() {
            warn!("Reference list '{}' is not an array, ignoring", name);
        }
        return Vec::new();
    };

    let options: Vec<T> = entries.iter().filter_map(convert).collect();
    if options.len() != entries.len() {
        debug!(
            "Dropped {} malformed '{}' entries",
            entries.len() - options.len(),
            name
        );
    }
    options
}

fn staff_option(entry: &Value) -> Option<DirectoryOption> {
    let raw: RawStaff = match serde_json::from_value(entry.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping staff entry: {}", e);
            return None;
        }
    };

    let Some(value) = EntityId::from_json(&raw.id) else {
        warn!("Skipping staff entry without id");
        return None;
    };

    Some(DirectoryOption {
        value,
        label: raw.nama_pegawai.unwrap_or_default(),
    })
}

fn student_option(entry: &Value) -> Option<StudentOption> {
    let raw: RawStudent = match serde_json::from_value(entry.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping student entry: {}", e);
            return None;
        }
    };

    let Some(value) = EntityId::from_json(&raw.value).or_else(|| EntityId::from_json(&raw.idsiswa))
    else {
        warn!("Skipping student entry without id");
        return None;
    };

    let student_name = text(&raw.label).or_else(|| text(&raw.namasiswa)).unwrap_or_default();
    let nis = text(&raw.nis);
    let label = format!("{} | {}", nis.as_deref().unwrap_or("-"), student_name);

    Some(StudentOption {
        value,
        label,
        student_name,
        nis,
        nisn: text(&raw.nisn),
        kelas: text(&raw.kelas),
    })
}

/// Text content of a scalar JSON field; numbers are rendered as text.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, SubmitResponse};
    use crate::intake::SubmissionPayload;
    use serde_json::json;

    fn parse(body: Value) -> ReferenceData {
        let response: ReferenceDataResponse = serde_json::from_value(body).unwrap();
        ReferenceData::from_response(response)
    }

    #[test]
    fn staff_entries_become_value_label_options() {
        let data = parse(json!({
            "success": true,
            "data": { "pegawai": [{ "id": 7, "nama_pegawai": "Budi" }], "siswa": [] }
        }));

        assert_eq!(
            data.staff,
            vec![DirectoryOption { value: EntityId::Number(7), label: "Budi".to_string() }]
        );
        assert!(data.students.is_empty());
    }

    #[test]
    fn student_entries_fall_back_to_legacy_field_names() {
        let data = parse(json!({
            "success": true,
            "data": {
                "pegawai": [],
                "siswa": [
                    {
                        "value": 3, "label": "Ani",
                        "nis": "1001", "nisn": "0099", "kelas": "X RPL 1"
                    },
                    { "idsiswa": "4", "namasiswa": "Dedi", "nis": 1002 }
                ]
            }
        }));

        assert_eq!(data.students.len(), 2);

        let ani = &data.students[0];
        assert_eq!(ani.value, EntityId::Number(3));
        assert_eq!(ani.label, "1001 | Ani");
        assert_eq!(ani.kelas.as_deref(), Some("X RPL 1"));

        let dedi = &data.students[1];
        assert_eq!(dedi.value, EntityId::Number(4));
        assert_eq!(dedi.student_name, "Dedi");
        assert_eq!(dedi.nis.as_deref(), Some("1002"));
        assert_eq!(dedi.nisn, None);
    }

    #[test]
    fn student_label_uses_dash_without_nis() {
        let data = parse(json!({
            "success": true,
            "data": { "siswa": [{ "value": 1, "label": "Rina" }] }
        }));
        assert_eq!(data.students[0].label, "- | Rina");
    }

    #[test]
    fn non_array_lists_and_entries_without_ids_are_dropped() {
        let data = parse(json!({
            "success": true,
            "data": {
                "pegawai": "not-a-list",
                "siswa": [
                    { "label": "No id" },
                    { "value": "", "label": "Blank id" },
                    { "value": 9 }
                ]
            }
        }));

        assert!(data.staff.is_empty());
        assert_eq!(data.students.len(), 1);
        assert_eq!(data.students[0].value, EntityId::Number(9));
    }

    #[test]
    fn unsuccessful_response_yields_empty_lists() {
        let data = parse(json!({
            "success": false,
            "message": "maintenance",
            "data": { "pegawai": [{ "id": 1, "nama_pegawai": "X" }] }
        }));
        assert_eq!(data, ReferenceData::empty());
    }

    #[test]
    fn lookups_match_normalized_ids() {
        let data = parse(json!({
            "success": true,
            "data": {
                "pegawai": [{ "id": "7", "nama_pegawai": "Budi" }],
                "siswa": [{ "value": 3, "label": "Ani" }]
            }
        }));

        assert_eq!(data.staff[0].value, EntityId::Number(7));
        assert!(data.find_student(&EntityId::parse("3").unwrap()).is_some());
        assert!(data.find_student(&EntityId::Number(4)).is_none());
    }

    #[test]
    fn zero_padded_student_ids_keep_their_own_entries() {
        let data = parse(json!({
            "success": true,
            "data": {
                "siswa": [
                    { "idsiswa": "0012", "namasiswa": "Ani", "nis": "1" },
                    { "idsiswa": "12", "namasiswa": "Budi", "nis": "2" }
                ]
            }
        }));

        assert_eq!(data.students[0].value, EntityId::Text("0012".to_string()));
        assert_eq!(data.students[1].value, EntityId::Number(12));

        let budi = data.find_student(&EntityId::Number(12)).unwrap();
        assert_eq!(budi.student_name, "Budi");
        let ani = data.find_student(&EntityId::parse("0012").unwrap()).unwrap();
        assert_eq!(ani.nis.as_deref(), Some("1"));
    }

    struct ReplyApi(fn() -> Result<ReferenceDataResponse, ApiError>);

    impl GuestbookApi for ReplyApi {
        fn fetch_reference_data(&self) -> Result<ReferenceDataResponse, ApiError> {
            (self.0)()
        }

        fn submit(&self, _payload: &SubmissionPayload) -> Result<SubmitResponse, ApiError> {
            Err(ApiError::Transport("not used".to_string()))
        }
    }

    #[test]
    fn failed_fetch_loads_empty_lists() {
        let failures: [fn() -> Result<ReferenceDataResponse, ApiError>; 3] = [
            || Err(ApiError::Transport("connection refused".to_string())),
            || Err(ApiError::Status { code: 500, message: None }),
            || Err(ApiError::Decode("expected value".to_string())),
        ];

        for reply in failures {
            assert_eq!(load_reference_data(&ReplyApi(reply)), ReferenceData::empty());
        }
    }

    #[test]
    fn successful_fetch_is_normalized() {
        let api = ReplyApi(|| {
            Ok(serde_json::from_value(json!({
                "success": true,
                "data": {
                    "pegawai": [{ "id": 7, "nama_pegawai": "Budi" }],
                    "siswa": [{ "value": 3, "label": "Ani", "nis": "1001" }]
                }
            }))
            .map_err(|e| ApiError::Decode(e.to_string()))?)
        });

        let data = load_reference_data(&api);
        assert_eq!(data.staff.len(), 1);
        assert_eq!(data.students[0].label, "1001 | Ani");
    }
}

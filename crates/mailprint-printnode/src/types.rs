//! PrintNode API types.

use serde::{Deserialize, Serialize};

/// Account details returned by `GET /whoami`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WhoAmI {
    /// Account id.
    pub id: u64,
    /// First name.
    #[serde(default)]
    pub firstname: String,
    /// Last name.
    #[serde(default)]
    pub lastname: String,
    /// Account email.
    #[serde(default)]
    pub email: String,
}

/// Computer a printer is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Computer {
    /// Computer id.
    pub id: u64,
    /// Computer name.
    pub name: String,
    /// Connection state (e.g. `connected`).
    #[serde(default)]
    pub state: Option<String>,
}

/// A printer visible to the account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Printer {
    /// Printer id.
    pub id: u64,
    /// Printer name.
    pub name: String,
    /// Driver description.
    #[serde(default)]
    pub description: Option<String>,
    /// Printer state (e.g. `online`).
    #[serde(default)]
    pub state: Option<String>,
    /// Whether this is the computer's default printer.
    #[serde(default)]
    pub default: Option<bool>,
    /// Owning computer.
    pub computer: Computer,
}

/// A submitted print job returned by `GET /printjobs/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    /// Job id.
    pub id: u64,
    /// Job title.
    #[serde(default)]
    pub title: String,
    /// Content type the job was submitted with.
    #[serde(default)]
    pub content_type: String,
    /// Submitting application.
    #[serde(default)]
    pub source: String,
    /// Job state (e.g. `new`, `sent_to_client`, `done`).
    #[serde(default)]
    pub state: String,
    /// Creation time as reported by the API.
    #[serde(default)]
    pub create_timestamp: String,
}

/// Request body for `POST /printjobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrintJob {
    /// Target printer.
    pub printer_id: u64,
    /// Job title.
    pub title: String,
    /// Always `pdf_base64`.
    pub content_type: String,
    /// Base64-encoded document.
    pub content: String,
    /// Submitting application.
    pub source: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_deserialize() {
        let json = r#"[{
            "id": 73001,
            "name": "Warehouse Laser",
            "description": "HP LaserJet",
            "state": "online",
            "default": true,
            "createTimestamp": "2024-01-01T00:00:00.000Z",
            "computer": {"id": 12, "name": "PACKING-PC", "state": "connected"}
        }]"#;

        let printers: Vec<Printer> = serde_json::from_str(json).unwrap();
        assert_eq!(printers.len(), 1);
        assert_eq!(printers[0].id, 73001);
        assert_eq!(printers[0].computer.name, "PACKING-PC");
        assert_eq!(printers[0].state.as_deref(), Some("online"));
    }

    #[test]
    fn test_print_job_deserialize_sparse() {
        let job: PrintJob = serde_json::from_str(r#"{"id": 5, "state": "done"}"#).unwrap();
        assert_eq!(job.id, 5);
        assert_eq!(job.state, "done");
        assert!(job.title.is_empty());

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["createTimestamp"], "");
    }

    #[test]
    fn test_new_job_is_camel_case() {
        let job = NewPrintJob {
            printer_id: 1,
            title: "t".into(),
            content_type: "pdf_base64".into(),
            content: "AA==".into(),
            source: "s".into(),
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["printerId"], 1);
        assert_eq!(value["contentType"], "pdf_base64");
    }
}

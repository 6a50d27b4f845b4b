//! Transport-agnostic request/response relay over an [`Array`].
//!
//! Requests and responses are plain serde types; the outer transport decides the framing.

use serde::{Deserialize, Serialize};

use crate::error::RaidError;
use crate::layout::stripe::traits::stripe::WriteOutcome;
use crate::retention::array::{Array, ArrayStatus};
use crate::retention::fault::ScrubReport;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Write { sector: usize, payload: Vec<u8> },
    Read { sector: usize },
    ReadRaw { disk_id: usize, sector: usize },
    InjectFault { disk_id: usize },
    Repair { disk_id: usize },
    Status,
    Scrub,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    pub ok: bool,
    pub failed_disk_ids: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReadResult {
    pub ok: bool,
    /// Absent when the read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    pub reconstructed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdminResult {
    pub ok: bool,
    pub disk_id: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sectors_rebuilt: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Write(WriteResult),
    Read(ReadResult),
    Admin(AdminResult),
    Status(ArrayStatus),
    Scrub(ScrubReport),
    Error { message: String },
}

/// RequestHandler answers one decoded request; failures are carried inside the response.
pub trait RequestHandler {
    fn handle(&self, request: Request) -> Response;
}

impl RequestHandler for Array {
    fn handle(&self, request: Request) -> Response {
        match request {
            Request::Write { sector, payload } => {
                Response::Write(write_result(self.write(sector, &payload)))
            }
            Request::Read { sector } => Response::Read(read_result(
                self.read(sector).map(|out| (out.bytes, out.reconstructed)),
            )),
            Request::ReadRaw { disk_id, sector } => Response::Read(read_result(
                self.read_raw(disk_id, sector).map(|bytes| (bytes, false)),
            )),
            Request::InjectFault { disk_id } => {
                Response::Admin(admin_result(disk_id, self.inject_fault(disk_id).map(|()| None)))
            }
            Request::Repair { disk_id } => Response::Admin(admin_result(
                disk_id,
                self.repair(disk_id).map(|r| Some(r.sectors_rebuilt)),
            )),
            Request::Status => Response::Status(self.get_status()),
            Request::Scrub => Response::Scrub(self.scrub()),
        }
    }
}

impl Response {
    /// `decode_error` wraps a request that could not be parsed.
    #[must_use]
    pub fn decode_error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            message: format!("bad request: {err}"),
        }
    }
}

fn write_result(res: Result<WriteOutcome, RaidError>) -> WriteResult {
    match res {
        Ok(outcome) => WriteResult {
            ok: true,
            failed_disk_ids: outcome.failed_disk_ids.into_iter().collect(),
            error: None,
        },
        Err(err) => {
            let failed_disk_ids = match &err {
                RaidError::PartialWriteFailure {
                    failed_disk_ids, ..
                } => failed_disk_ids.iter().copied().collect(),
                RaidError::Unrecoverable { unavailable, .. } => unavailable.clone(),
                _ => Vec::new(),
            };
            WriteResult {
                ok: false,
                failed_disk_ids,
                error: Some(err.to_string()),
            }
        }
    }
}

fn read_result<E: std::fmt::Display>(res: Result<(Vec<u8>, bool), E>) -> ReadResult {
    match res {
        Ok((bytes, reconstructed)) => ReadResult {
            ok: true,
            bytes: Some(bytes),
            reconstructed,
            error: None,
        },
        Err(err) => ReadResult {
            error: Some(err.to_string()),
            ..ReadResult::default()
        },
    }
}

fn admin_result<E: std::fmt::Display>(disk_id: usize, res: Result<Option<usize>, E>) -> AdminResult {
    match res {
        Ok(sectors_rebuilt) => AdminResult {
            ok: true,
            disk_id,
            sectors_rebuilt,
            error: None,
        },
        Err(err) => AdminResult {
            ok: false,
            disk_id,
            sectors_rebuilt: None,
            error: Some(err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::layout::stripe::RaidType;
    use crate::retention::array::ArrayConfig;

    fn parity_array() -> Array {
        Array::new(&ArrayConfig {
            raid_type: RaidType::Parity,
            disks: 4,
            sector_size: 4,
            sector_count: 8,
            ..ArrayConfig::default()
        })
        .expect("array")
    }

    fn call(array: &Array, line: &str) -> serde_json::Value {
        let request: Request = serde_json::from_str(line).expect("request");
        serde_json::to_value(array.handle(request)).expect("response")
    }

    #[test]
    fn requests_decode_from_tagged_json() {
        let req: Request = serde_json::from_value(json!({
            "op": "write",
            "sector": 3,
            "payload": [1, 2, 3]
        }))
        .expect("write");
        assert_eq!(
            req,
            Request::Write {
                sector: 3,
                payload: vec![1, 2, 3],
            }
        );
        let req: Request = serde_json::from_str(r#"{"op":"status"}"#).expect("status");
        assert_eq!(req, Request::Status);
        let req: Request =
            serde_json::from_str(r#"{"op":"read_raw","disk_id":1,"sector":0}"#).expect("raw");
        assert_eq!(req, Request::ReadRaw { disk_id: 1, sector: 0 });
    }

    #[test]
    fn relay_round_trip_with_fault_and_repair() {
        let a = parity_array();
        let payload: Vec<u8> = b"AAAABBBBCCCC".to_vec();
        let write = serde_json::to_string(&Request::Write { sector: 0, payload }).expect("encode");

        let resp = call(&a, &write);
        assert_eq!(resp["kind"], "write");
        assert_eq!(resp["ok"], true);

        let resp = call(&a, r#"{"op":"inject_fault","disk_id":1}"#);
        assert_eq!(resp["kind"], "admin");
        assert_eq!(resp["ok"], true);

        let resp = call(&a, r#"{"op":"read","sector":0}"#);
        assert_eq!(resp["reconstructed"], true);
        let bytes: Vec<u8> = serde_json::from_value(resp["bytes"].clone()).expect("bytes");
        assert_eq!(bytes, b"AAAABBBBCCCC");

        let resp = call(&a, r#"{"op":"repair","disk_id":1}"#);
        assert_eq!(resp["sectors_rebuilt"], 1);

        let resp = call(&a, r#"{"op":"status"}"#);
        assert_eq!(resp["kind"], "status");
        assert_eq!(resp["degraded"], false);
        assert_eq!(resp["disks"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn failures_are_reported_in_band() {
        let a = parity_array();
        a.inject_fault(0).expect("inject");

        let resp = a.handle(Request::Write {
            sector: 0,
            payload: b"AAAABBBBCCCC".to_vec(),
        });
        let Response::Write(result) = resp else {
            panic!("expected a write response");
        };
        assert!(!result.ok);
        assert_eq!(result.failed_disk_ids, vec![0]);
        assert!(result.error.is_some_and(|e| e.contains("partial write")));

        let resp = a.handle(Request::ReadRaw { disk_id: 0, sector: 0 });
        let Response::Read(read) = resp else {
            panic!("expected a read response");
        };
        assert!(!read.ok);
        assert_eq!(read.bytes, None);
        assert!(read.error.is_some());

        a.inject_fault(1).expect("second fault");
        let resp = serde_json::to_value(a.handle(Request::Read { sector: 0 })).expect("json");
        assert_eq!(resp["ok"], false);
        assert!(resp.get("bytes").is_none(), "failed read carries no bytes: {resp}");

        let resp = a.handle(Request::InjectFault { disk_id: 9 });
        assert!(matches!(resp, Response::Admin(AdminResult { ok: false, disk_id: 9, .. })));
    }

    #[test]
    fn scrub_and_decode_errors_serialize() {
        let a = parity_array();
        let resp = call(&a, r#"{"op":"scrub"}"#);
        assert_eq!(resp["kind"], "scrub");
        assert_eq!(resp["sectors_checked"], 8);

        let err = serde_json::from_str::<Request>(r#"{"op":"format"}"#).unwrap_err();
        let resp = serde_json::to_value(Response::decode_error(err)).expect("json");
        assert_eq!(resp["kind"], "error");
        assert!(resp["message"].as_str().is_some_and(|m| m.starts_with("bad request")));
    }
}

// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Line-oriented JSON front end for `IPower`.
//!
//! Each line on the input is one `PowerRequest`; each produces exactly one `PowerResponse` line.
//! Requests are handled one at a time in arrival order.

use std::fmt;
use std::fmt::Display;
use std::io;
use std::io::BufRead;
use std::io::Write;

use base::debug;
use base::warn;
use power_hal::aidl::Boost;
use power_hal::aidl::ExceptionCode;
use power_hal::aidl::Mode;
use power_hal::aidl::PowerHintSession;
use power_hal::aidl::Status;
use power_hal::IPower;
use serde::Deserialize;
use serde::Serialize;

/// A framework call on the power HAL. Enum arguments carry their raw platform values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerRequest {
    SetMode {
        mode: i32,
        enabled: bool,
    },
    IsModeSupported {
        mode: i32,
    },
    SetBoost {
        boost: i32,
        duration_ms: i32,
    },
    IsBoostSupported {
        boost: i32,
    },
    CreateHintSession {
        tgid: i32,
        uid: i32,
        thread_ids: Vec<i32>,
        duration_nanos: i64,
    },
    GetHintSessionPreferredRate,
}

/// Outcome of a `PowerRequest`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerResponse {
    Ok,
    Bool(bool),
    Rate(i64),
    Err {
        exception: i32,
        message: Option<String>,
    },
}

impl From<Status> for PowerResponse {
    fn from(status: Status) -> Self {
        PowerResponse::Err {
            exception: status.exception_code().0,
            message: status.message().map(str::to_string),
        }
    }
}

impl Display for PowerResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::PowerResponse::*;

        match self {
            Ok => write!(f, "ok"),
            Bool(b) => write!(f, "{}", b),
            Rate(r) => write!(f, "rate {}", r),
            Err {
                exception,
                message: Some(message),
            } => write!(f, "exception {}: {}", exception, message),
            Err {
                exception,
                message: None,
            } => write!(f, "exception {}", exception),
        }
    }
}

fn illegal_argument(message: String) -> Status {
    Status::new_exception(ExceptionCode::ILLEGAL_ARGUMENT, Some(&message))
}

fn mode(raw: i32) -> Result<Mode, Status> {
    Mode::n(raw).ok_or_else(|| illegal_argument(format!("unknown mode {}", raw)))
}

fn boost(raw: i32) -> Result<Boost, Status> {
    Boost::n(raw).ok_or_else(|| illegal_argument(format!("unknown boost {}", raw)))
}

impl PowerRequest {
    /// Runs this request against `power`.
    pub fn execute(&self, power: &dyn IPower) -> PowerResponse {
        let result = match *self {
            PowerRequest::SetMode { mode: raw, enabled } => {
                mode(raw).and_then(|m| power.setMode(m, enabled)).map(|()| PowerResponse::Ok)
            }
            PowerRequest::IsModeSupported { mode: raw } => mode(raw)
                .and_then(|m| power.isModeSupported(m))
                .map(PowerResponse::Bool),
            PowerRequest::SetBoost {
                boost: raw,
                duration_ms,
            } => boost(raw)
                .and_then(|b| power.setBoost(b, duration_ms))
                .map(|()| PowerResponse::Ok),
            PowerRequest::IsBoostSupported { boost: raw } => boost(raw)
                .and_then(|b| power.isBoostSupported(b))
                .map(PowerResponse::Bool),
            PowerRequest::CreateHintSession {
                tgid,
                uid,
                ref thread_ids,
                duration_nanos,
            } => power
                .createHintSession(tgid, uid, thread_ids, duration_nanos)
                .map(|session: PowerHintSession| -> PowerResponse { match session {} }),
            PowerRequest::GetHintSessionPreferredRate => power
                .getHintSessionPreferredRate()
                .map(PowerResponse::Rate),
        };
        result.unwrap_or_else(PowerResponse::from)
    }
}

/// Answers requests from `input` on `output` until `input` is exhausted.
///
/// A line that is not a valid request, including one that is not UTF-8, is answered with an
/// `ILLEGAL_ARGUMENT` error; only I/O failures end the loop early.
pub fn serve<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    power: &dyn IPower,
) -> io::Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let response = match serde_json::from_slice::<PowerRequest>(&line) {
            Ok(request) => {
                let response = request.execute(power);
                debug!("{:?} -> {}", request, response);
                response
            }
            Err(e) => {
                warn!(
                    "malformed request {:?}: {}",
                    String::from_utf8_lossy(&line).trim_end(),
                    e
                );
                illegal_argument(format!("malformed request: {}", e)).into()
            }
        };
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use power_hal::aidl::Result;

    use super::*;

    /// Records `setMode` calls and otherwise behaves like a HAL with nothing to drive.
    #[derive(Default)]
    struct FakePower {
        modes: Mutex<Vec<(Mode, bool)>>,
    }

    #[allow(non_snake_case)]
    impl IPower for FakePower {
        fn setMode(&self, mode: Mode, enabled: bool) -> Result<()> {
            self.modes.lock().unwrap().push((mode, enabled));
            Ok(())
        }

        fn isModeSupported(&self, mode: Mode) -> Result<bool> {
            Ok(mode == Mode::Launch)
        }

        fn setBoost(&self, _boost: Boost, _durationMs: i32) -> Result<()> {
            Err(Status::new_exception(ExceptionCode::UNSUPPORTED_OPERATION, None))
        }

        fn isBoostSupported(&self, _boost: Boost) -> Result<bool> {
            Ok(false)
        }

        fn createHintSession(
            &self,
            _tgid: i32,
            _uid: i32,
            _threadIds: &[i32],
            _durationNanos: i64,
        ) -> Result<PowerHintSession> {
            Err(Status::new_exception(ExceptionCode::UNSUPPORTED_OPERATION, None))
        }

        fn getHintSessionPreferredRate(&self) -> Result<i64> {
            Ok(16_666_666)
        }
    }

    fn run<I: AsRef<[u8]>>(input: I, power: &dyn IPower) -> Vec<PowerResponse> {
        let mut output = Vec::new();
        serve(input.as_ref(), &mut output, power).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn request_wire_format() {
        let request: PowerRequest =
            serde_json::from_str(r#"{"SetMode":{"mode":5,"enabled":true}}"#).unwrap();
        assert_eq!(
            request,
            PowerRequest::SetMode {
                mode: 5,
                enabled: true
            }
        );
        assert_eq!(
            serde_json::to_string(&PowerResponse::Bool(true)).unwrap(),
            r#"{"Bool":true}"#
        );
        assert_eq!(serde_json::to_string(&PowerResponse::Ok).unwrap(), r#""Ok""#);
    }

    #[test]
    fn serves_each_line() {
        let power = FakePower::default();
        let responses = run(
            concat!(
                r#"{"SetMode":{"mode":5,"enabled":true}}"#,
                "\n\n",
                r#"{"IsModeSupported":{"mode":5}}"#,
                "\n",
                r#"{"SetBoost":{"boost":0,"duration_ms":100}}"#,
                "\n",
                r#""GetHintSessionPreferredRate""#,
                "\n",
            ),
            &power,
        );
        assert_eq!(
            responses,
            [
                PowerResponse::Ok,
                PowerResponse::Bool(true),
                PowerResponse::Err {
                    exception: -7,
                    message: None
                },
                PowerResponse::Rate(16_666_666),
            ]
        );
        assert_eq!(*power.modes.lock().unwrap(), [(Mode::Launch, true)]);
    }

    #[test]
    fn bad_requests_are_illegal_arguments() {
        let power = FakePower::default();
        let responses = run(
            "{\"SetMode\":{\"mode\":42,\"enabled\":true}}\nnot json\n",
            &power,
        );
        assert_eq!(responses.len(), 2);
        for response in responses {
            match response {
                PowerResponse::Err { exception, .. } => assert_eq!(exception, -3),
                other => panic!("unexpected response {}", other),
            }
        }
        assert!(power.modes.lock().unwrap().is_empty());
    }

    #[test]
    fn invalid_utf8_line_does_not_stop_serving() {
        let power = FakePower::default();
        let responses = run(
            b"\xff\xfe garbage\n{\"IsModeSupported\":{\"mode\":5}}\n",
            &power,
        );
        assert_eq!(responses.len(), 2);
        assert!(
            matches!(responses[0], PowerResponse::Err { exception: -3, .. }),
            "{}",
            responses[0]
        );
        assert_eq!(responses[1], PowerResponse::Bool(true));
    }

    #[test]
    fn last_line_without_newline_is_served() {
        let power = FakePower::default();
        let responses = run(r#"{"SetMode":{"mode":5,"enabled":false}}"#, &power);
        assert_eq!(responses, [PowerResponse::Ok]);
        assert_eq!(*power.modes.lock().unwrap(), [(Mode::Launch, false)]);
    }

    #[test]
    fn hint_session_unsupported() {
        let power = FakePower::default();
        let request = PowerRequest::CreateHintSession {
            tgid: 1,
            uid: 1000,
            thread_ids: vec![1, 2],
            duration_nanos: 16_000_000,
        };
        assert_eq!(
            request.execute(&power),
            PowerResponse::Err {
                exception: -7,
                message: None
            }
        );
    }
}

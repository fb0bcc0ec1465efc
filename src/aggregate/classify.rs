//! Outcome classification for raw results.

use crate::api::{Outcome, RawResult, ResultStatus};

/// How one raw result counts towards a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub success: bool,
    pub failure: bool,
    pub timeout: bool,
    pub class_2xx: bool,
    pub class_4xx: bool,
    pub class_5xx: bool,
}

impl Classification {
    fn from_status(status: ResultStatus) -> Self {
        // Anything other than an explicit success is a failure, including
        // timeouts reported through `status` and unrecognized values.
        if status == ResultStatus::Success {
            Self {
                success: true,
                ..Default::default()
            }
        } else {
            Self {
                failure: true,
                ..Default::default()
            }
        }
    }
}

/// Classify a result.
///
/// With `fine_grained` set and a known outcome tag, the response class wins:
/// `timeout` counts as neither success nor failure. Otherwise the coarse
/// `status` decides.
pub fn classify(result: &RawResult, fine_grained: bool) -> Classification {
    if !fine_grained {
        return Classification::from_status(result.status);
    }

    match result.outcome {
        Some(Outcome::Timeout) => Classification {
            timeout: true,
            ..Default::default()
        },
        Some(Outcome::Class2xx) => Classification {
            success: true,
            class_2xx: true,
            ..Default::default()
        },
        Some(Outcome::Class4xx) => Classification {
            failure: true,
            class_4xx: true,
            ..Default::default()
        },
        Some(Outcome::Class5xx) => Classification {
            failure: true,
            class_5xx: true,
            ..Default::default()
        },
        Some(Outcome::Other) | None => Classification::from_status(result.status),
    }
}

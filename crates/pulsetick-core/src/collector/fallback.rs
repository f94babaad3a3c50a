use std::fmt::{Display, Formatter};

use crate::data_source::{SeriesPoint, SeriesRequest, SeriesSource, SourceError};
use crate::domain::DateWindow;

/// The first candidate that returned a non-empty series.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSeries {
    pub identifier: String,
    pub points: Vec<SeriesPoint>,
    /// Candidates tried before `identifier`, with why they were passed over.
    pub passed_over: Vec<FetchAttempt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Empty,
    Failed(SourceError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchAttempt {
    pub identifier: String,
    pub outcome: AttemptOutcome,
}

impl Display for FetchAttempt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Empty => write!(f, "{}: empty series", self.identifier),
            AttemptOutcome::Failed(error) => write!(f, "{}: {}", self.identifier, error),
        }
    }
}

/// Try `candidates` in order and keep the first non-empty series.
///
/// Errors and empty results both move on to the next candidate. When every
/// candidate is exhausted the attempts are returned for reporting.
pub async fn fetch_first_non_empty(
    source: &dyn SeriesSource,
    candidates: &[&str],
    window: &DateWindow,
) -> Result<FetchedSeries, Vec<FetchAttempt>> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for identifier in candidates {
        let outcome = match SeriesRequest::new(*identifier, *window) {
            Ok(request) => match source.fetch(request).await {
                Ok(points) if !points.is_empty() => {
                    tracing::info!(
                        provider = %source.id(),
                        identifier = *identifier,
                        points = points.len(),
                        "series fetched"
                    );
                    return Ok(FetchedSeries {
                        identifier: (*identifier).to_owned(),
                        points,
                        passed_over: attempts,
                    });
                }
                Ok(_) => AttemptOutcome::Empty,
                Err(error) => AttemptOutcome::Failed(error),
            },
            Err(error) => AttemptOutcome::Failed(error),
        };

        let attempt = FetchAttempt {
            identifier: (*identifier).to_owned(),
            outcome,
        };
        tracing::warn!(provider = %source.id(), attempt = %attempt, "candidate produced no data");
        attempts.push(attempt);
    }

    Err(attempts)
}

//! Batch worker: concurrent assessment of many patients.
//!
//! Worker threads share one [`AssessmentService`] by reference and claim
//! inputs through an atomic cursor. Results come back over a channel tagged
//! with their input index, so the output order always matches the input
//! order regardless of which worker finished first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use crate::application::AssessmentService;
use crate::domain::{AssessmentResult, PatientInput};
use crate::ports::{FeatureScaler, RiskClassifier};
use crate::Result;

/// Assess every input using up to `workers` threads.
///
/// Each entry of the returned vector is the outcome for the input at the same
/// position. A failed input does not affect any other.
pub fn assess_batch<C, S>(
    service: &AssessmentService<C, S>,
    inputs: &[PatientInput],
    workers: usize,
) -> Vec<Result<AssessmentResult>>
where
    C: RiskClassifier,
    S: FeatureScaler,
{
    if inputs.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, inputs.len());
    tracing::info!("Assessing {} patients on {} workers", inputs.len(), workers);

    let cursor = AtomicUsize::new(0);
    let mut slots: Vec<Option<Result<AssessmentResult>>> =
        std::iter::repeat_with(|| None).take(inputs.len()).collect();

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();

        for _ in 0..workers {
            let tx = tx.clone();
            let cursor = &cursor;
            scope.spawn(move || loop {
                let idx = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(input) = inputs.get(idx) else {
                    break;
                };
                if tx.send((idx, service.assess(input))).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        for (idx, outcome) in rx {
            slots[idx] = Some(outcome);
        }
    });

    // Every index is filled once the scope has joined all workers.
    let results: Vec<_> = slots.into_iter().flatten().collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    tracing::info!(
        "Batch complete: {} assessed, {} failed",
        results.len() - failed,
        failed
    );
    results
}

/// Assess decoded records, keeping records that failed to decode in place.
///
/// A record that arrived as `Err` is reported in its own slot and never
/// reaches the workers; the remaining records are assessed with
/// [`assess_batch`].
pub fn assess_records<C, S>(
    service: &AssessmentService<C, S>,
    records: Vec<Result<PatientInput>>,
    workers: usize,
) -> Vec<Result<AssessmentResult>>
where
    C: RiskClassifier,
    S: FeatureScaler,
{
    let mut inputs = Vec::with_capacity(records.len());
    let mut rejected: Vec<Option<Result<AssessmentResult>>> = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        match record {
            Ok(input) => {
                inputs.push(input);
                rejected.push(None);
            }
            Err(e) => {
                tracing::warn!(
                    "Record #{} rejected before assessment: invalid {}",
                    idx + 1,
                    e.field().unwrap_or("record")
                );
                rejected.push(Some(Err(e)));
            }
        }
    }

    let mut assessed = assess_batch(service, &inputs, workers).into_iter();
    rejected
        .into_iter()
        .filter_map(|slot| slot.or_else(|| assessed.next()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::assessment::stubs::{BmiClassifier, PassthroughScaler};
    use crate::domain::fixtures::{healthy_patient, high_risk_patient};
    use crate::domain::CategoricalCodec;
    use crate::CardioriskError;
    use std::sync::Arc;

    fn service() -> AssessmentService<BmiClassifier, PassthroughScaler> {
        AssessmentService::new(
            Arc::new(BmiClassifier),
            Arc::new(PassthroughScaler),
            Arc::new(CategoricalCodec::standard()),
        )
    }

    fn patients(n: usize) -> Vec<PatientInput> {
        (0..n)
            .map(|i| {
                let mut p = healthy_patient();
                p.bmi = 10.0 + i as f64;
                p
            })
            .collect()
    }

    #[test]
    fn test_results_keep_input_order() {
        let inputs = patients(40);
        let results = assess_batch(&service(), &inputs, 8);

        assert_eq!(results.len(), inputs.len());
        for (input, result) in inputs.iter().zip(&results) {
            let result = result.as_ref().expect("Should assess");
            assert!((result.probability - input.bmi / 100.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_worker_matches_many() {
        let inputs = patients(12);
        let service = service();
        let one: Vec<f64> = assess_batch(&service, &inputs, 1)
            .into_iter()
            .map(|r| r.expect("Should assess").probability)
            .collect();
        let many: Vec<f64> = assess_batch(&service, &inputs, 5)
            .into_iter()
            .map(|r| r.expect("Should assess").probability)
            .collect();
        assert_eq!(one, many);
    }

    #[test]
    fn test_failure_is_isolated() {
        let mut bad = healthy_patient();
        bad.diabetic = "Sometimes".into();
        let inputs = vec![healthy_patient(), bad, high_risk_patient()];

        let results = assess_batch(&service(), &inputs, 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(CardioriskError::UnknownCategory { field: "Diabetic", .. })
        ));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_undecodable_records_keep_their_slot() {
        let records = vec![
            Ok(healthy_patient()),
            Err(CardioriskError::Validation {
                field: "physical_health",
                reason: "invalid value: integer `-1`, expected u8".into(),
            }),
            Ok(high_risk_patient()),
            Err(CardioriskError::Validation {
                field: "patient",
                reason: "record is not a JSON object".into(),
            }),
        ];

        let results = assess_records(&service(), records, 2);
        assert_eq!(results.len(), 4);
        let first = results[0].as_ref().expect("Should assess");
        assert!((first.probability - healthy_patient().bmi / 100.0).abs() < 1e-12);
        assert_eq!(
            results[1].as_ref().expect_err("rejected").field(),
            Some("physical_health")
        );
        let third = results[2].as_ref().expect("Should assess");
        assert!((third.probability - high_risk_patient().bmi / 100.0).abs() < 1e-12);
        assert_eq!(results[3].as_ref().expect_err("rejected").field(), Some("patient"));
    }

    #[test]
    fn test_empty_batch_and_zero_workers() {
        assert!(assess_batch(&service(), &[], 4).is_empty());

        let results = assess_batch(&service(), &patients(3), 0);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }
}

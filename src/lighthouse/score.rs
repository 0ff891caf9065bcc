use super::LighthouseOutcome;
use crate::error::DirectoryError;
use serde_json::Value;

/// Pulls the PWA score out of a runner response.
///
/// Accepted shapes, in order:
/// - PageSpeed Insights envelope: `lighthouseResult.categories.pwa.score`
/// - bare Lighthouse report: `categories.pwa.score`
/// - legacy report with a top-level `score`
///
/// Category scores are fractions in `0..=1` and get scaled to `0..=100`;
/// legacy scores are already on that scale.
pub fn extract_outcome(body: Value) -> Result<LighthouseOutcome, DirectoryError> {
    let report = match body {
        Value::Object(mut map) if map.contains_key("lighthouseResult") => map
            .remove("lighthouseResult")
            .unwrap_or(Value::Null),
        other => other,
    };

    let category = report
        .pointer("/categories/pwa/score")
        .and_then(Value::as_f64);
    let score = if let Some(fraction) = category {
        checked_score(fraction * 100.0)?
    } else if let Some(legacy) = report.get("score").and_then(Value::as_f64) {
        checked_score(legacy)?
    } else {
        return Err(DirectoryError::LighthouseReport(
            "no PWA category score".to_string(),
        ));
    };

    Ok(LighthouseOutcome { score, report })
}

#[allow(clippy::cast_possible_truncation)]
fn checked_score(score: f64) -> Result<i64, DirectoryError> {
    if !(0.0..=100.0).contains(&score) {
        return Err(DirectoryError::LighthouseReport(format!(
            "score out of range: {score}"
        )));
    }
    Ok(score.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn psi_envelope_is_unwrapped() {
        let body = json!({
            "id": "https://app.example/",
            "lighthouseResult": {
                "requestedUrl": "https://app.example/",
                "categories": { "pwa": { "score": 0.92 } }
            }
        });
        let outcome = extract_outcome(body).unwrap();
        assert_eq!(outcome.score, 92);
        assert_eq!(outcome.report["requestedUrl"], "https://app.example/");
        assert!(outcome.report.get("lighthouseResult").is_none());
    }

    #[test]
    fn bare_report_and_legacy_score_are_accepted() {
        let bare = json!({ "categories": { "pwa": { "score": 0.5 } } });
        assert_eq!(extract_outcome(bare).unwrap().score, 50);

        let legacy = json!({ "score": 73 });
        assert_eq!(extract_outcome(legacy).unwrap().score, 73);
    }

    #[test]
    fn legacy_scores_are_not_rescaled() {
        assert_eq!(extract_outcome(json!({ "score": 1 })).unwrap().score, 1);
        assert_eq!(extract_outcome(json!({ "score": 0 })).unwrap().score, 0);
    }

    #[test]
    fn fractional_one_means_full_marks() {
        let bare = json!({ "categories": { "pwa": { "score": 1 } } });
        assert_eq!(extract_outcome(bare).unwrap().score, 100);
    }

    #[test]
    fn missing_or_null_score_is_an_error() {
        // Lighthouse reports `null` when the category could not be computed.
        let null_score = json!({ "categories": { "pwa": { "score": null } } });
        assert!(matches!(
            extract_outcome(null_score),
            Err(DirectoryError::LighthouseReport(_))
        ));
        assert!(extract_outcome(json!({ "categories": {} })).is_err());
        assert!(extract_outcome(json!({ "score": 250 })).is_err());
        assert!(extract_outcome(json!({ "categories": { "pwa": { "score": 1.5 } } })).is_err());
    }
}

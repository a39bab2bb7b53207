//! Mean Likert scores per site group.

use crate::models::{Question, SiteKey};
use crate::survey::Survey;
use std::io::Write;

/// Mean numeric score for each question on one site group.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteScores {
    pub key: SiteKey,
    pub means: Vec<(Question, f64)>,
}

/// Average each question's score (-2..=2) over the group's submissions.
///
/// Every submission that carries the question column is counted, including
/// unanswered ones, which score 0.
pub fn mean_scores(survey: &Survey, questions: &[Question]) -> Vec<SiteScores> {
    survey
        .groups()
        .map(|(key, records)| {
            let means = questions
                .iter()
                .map(|&q| {
                    let (sum, n) = records
                        .iter()
                        .filter_map(|r| r.responses.get(&q))
                        .fold((0i32, 0usize), |(sum, n), resp| (sum + resp.score(), n + 1));
                    (q, f64::from(sum) / n.max(1) as f64)
                })
                .collect();

            SiteScores {
                key: key.clone(),
                means,
            }
        })
        .collect()
}

/// Write scores as CSV: `URL,Platform,<question...>`.
pub fn write_scores_csv<W: Write>(
    scores: &[SiteScores],
    questions: &[Question],
    out: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["URL".to_string(), "Platform".to_string()];
    header.extend(questions.iter().map(|q| q.label().to_string()));
    writer.write_record(&header)?;

    for site in scores {
        let mut row = vec![site.key.site.clone(), site.key.platform.to_string()];
        row.extend(site.means.iter().map(|(_, mean)| format!("{}", mean)));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, RatingRecord, Response};

    fn record(site: &str, platform: Platform, answer: &str) -> RatingRecord {
        RatingRecord::new(SiteKey::new(site, platform), "Alice")
            .with_response(Question::ButtonDiscover, Response::parse(answer))
    }

    #[test]
    fn test_mean_scores() {
        let survey = Survey::from_records(vec![
            record("https://a.org", Platform::Desktop, "Strongly agree"),
            record("https://a.org", Platform::Desktop, "Somewhat disagree"),
            record("https://a.org", Platform::Desktop, ""),
            record("https://a.org", Platform::Mobile, "Strongly disagree"),
        ]);

        let scores = mean_scores(&survey, &[Question::ButtonDiscover, Question::TextDiscover]);
        assert_eq!(scores.len(), 2);

        // (2 - 1 + 0) / 3
        assert_eq!(scores[0].key.platform, Platform::Desktop);
        assert!((scores[0].means[0].1 - 1.0 / 3.0).abs() < 1e-12);
        // Column absent everywhere: divides by max(n, 1)
        assert_eq!(scores[0].means[1], (Question::TextDiscover, 0.0));
        assert_eq!(scores[1].means[0].1, -2.0);
    }

    #[test]
    fn test_write_scores_csv() {
        let survey = Survey::from_records(vec![record(
            "https://a.org",
            Platform::Mobile,
            "Somewhat agree",
        )]);
        let questions = [Question::ButtonDiscover];
        let scores = mean_scores(&survey, &questions);

        let mut buf = Vec::new();
        write_scores_csv(&scores, &questions, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text, "URL,Platform,button-discover\nhttps://a.org,Mobile,1\n");
    }
}

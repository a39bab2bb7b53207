//! Combined per-site dataset for downstream modelling.
//!
//! Joins each site info row with its one-hot button features, the mean
//! Likert score per question, and the averaged task timings. Site groups
//! without ratings or timings get 0 in those columns.

use super::scores::mean_scores;
use crate::models::{Question, SiteKey, TimingTest};
use crate::survey::{SiteInfo, Survey, Timings};
use std::collections::BTreeMap;
use std::io::Write;

const SIZES: [(&str, &str); 6] = [
    ("text", "Size_text"),
    ("small", "Size_small"),
    ("average", "Size_average"),
    ("wide", "Size_wide"),
    ("long", "Size_long"),
    ("large", "Size_large"),
];

const LOCATIONS: [(&str, &str); 11] = [
    ("top left", "Location_top_left"),
    ("top", "Location_top"),
    ("top right", "Location_top_right"),
    ("left", "Location_left"),
    ("content", "Location_content"),
    ("right", "Location_right"),
    ("bottom left", "Location_bottom_left"),
    ("bottom", "Location_bottom"),
    ("bottom right", "Location_bottom_right"),
    ("dropdown", "Location_dropdown"),
    ("side menu", "Location_menu"),
];

const TYPES: [(&str, &str); 5] = [
    ("button", "Type_button"),
    ("banner", "Type_banner"),
    ("image", "Type_image_icon"),
    ("menu item", "Type_menu_item"),
    ("text", "Type_text"),
];

const VISIBILITY: [(&str, &str); 3] = [
    ("Yes", "Visible_yes"),
    ("Cookie Notice", "Visible_covered"),
    ("No", "Visible_no"),
];

/// Names of the boolean feature columns, in output order.
pub fn feature_columns() -> Vec<&'static str> {
    let mut columns = Vec::new();
    columns.extend(SIZES.iter().map(|(_, col)| *col));
    columns.extend(LOCATIONS.iter().map(|(_, col)| *col));
    columns.extend(TYPES.iter().map(|(_, col)| *col));
    columns.push("Sticky");
    columns.extend(VISIBILITY.iter().map(|(_, col)| *col));
    columns.push("Labelled");
    columns.push("Single_click");
    columns
}

fn one_hot(options: &[(&str, &str)], value: &str) -> Vec<bool> {
    let value = value.trim();
    options.iter().map(|(option, _)| *option == value).collect()
}

/// Boolean features of one site, aligned with [`feature_columns`].
pub fn site_features(info: &SiteInfo) -> Vec<bool> {
    let mut features = Vec::new();
    features.extend(one_hot(&SIZES, &info.size));
    features.extend(one_hot(&LOCATIONS, &info.location));
    features.extend(one_hot(&TYPES, &info.button_type));
    features.push(info.is_sticky());
    features.extend(one_hot(&VISIBILITY, &info.visible_on_load));
    features.push(info.is_labelled());
    features.push(info.is_single_click());
    features
}

/// One row of the combined dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub key: SiteKey,
    pub features: Vec<bool>,
    /// Mean score per question, in the order the questions were given.
    pub likert: Vec<f64>,
    /// Seconds per [`TimingTest::ALL`] entry.
    pub timings: Vec<f64>,
}

/// Build one row per site info entry.
pub fn combine(
    sites: &[SiteInfo],
    survey: &Survey,
    timings: &Timings,
    questions: &[Question],
) -> Vec<DatasetRow> {
    let means: BTreeMap<SiteKey, Vec<f64>> = mean_scores(survey, questions)
        .into_iter()
        .map(|s| (s.key, s.means.into_iter().map(|(_, mean)| mean).collect()))
        .collect();

    sites
        .iter()
        .map(|info| {
            let key = info.key();
            let likert = means
                .get(&key)
                .cloned()
                .unwrap_or_else(|| vec![0.0; questions.len()]);
            let seconds = TimingTest::ALL
                .iter()
                .map(|&test| timings.get(&key, test).unwrap_or(0.0))
                .collect();

            DatasetRow {
                features: site_features(info),
                key,
                likert,
                timings: seconds,
            }
        })
        .collect()
}

/// Write the dataset as CSV. Boolean features are written as `1`/`0`.
pub fn write_dataset_csv<W: Write>(
    rows: &[DatasetRow],
    questions: &[Question],
    out: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["URL".to_string(), "Platform".to_string()];
    header.extend(feature_columns().into_iter().map(String::from));
    header.extend(questions.iter().map(|q| q.label().to_string()));
    header.extend(TimingTest::ALL.iter().map(|t| t.label().to_string()));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.key.site.clone(), row.key.platform.to_string()];
        record.extend(row.features.iter().map(|&f| u8::from(f).to_string()));
        record.extend(row.likert.iter().map(|v| v.to_string()));
        record.extend(row.timings.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, RatingRecord, Response};

    fn info(url: &str, platform: Platform) -> SiteInfo {
        SiteInfo {
            url: url.to_string(),
            platform,
            size: "small".to_string(),
            location: "side menu".to_string(),
            button_type: "image".to_string(),
            sticky: "TRUE".to_string(),
            visible_on_load: "Cookie Notice".to_string(),
            label: String::new(),
            clicks_required: "1".to_string(),
        }
    }

    fn enabled(features: &[bool]) -> Vec<&'static str> {
        feature_columns()
            .into_iter()
            .zip(features)
            .filter(|(_, on)| **on)
            .map(|(col, _)| col)
            .collect()
    }

    #[test]
    fn test_one_hot_features() {
        let features = site_features(&info("https://a.org", Platform::Desktop));
        assert_eq!(features.len(), feature_columns().len());
        assert_eq!(
            enabled(&features),
            vec![
                "Size_small",
                "Location_menu",
                "Type_image_icon",
                "Sticky",
                "Visible_covered",
                "Single_click"
            ]
        );

        let mut unknown = info("https://b.org", Platform::Mobile);
        unknown.size = "huge".to_string();
        unknown.location = String::new();
        let features = site_features(&unknown);
        assert!(!enabled(&features).iter().any(|c| c.starts_with("Size_") || c.starts_with("Location_")));
    }

    #[test]
    fn test_combine_fills_missing_groups_with_zero() {
        let survey = Survey::from_records(vec![RatingRecord::new(
            SiteKey::new("https://a.org", Platform::Desktop),
            "Alice",
        )
        .with_response(Question::ButtonDiscover, Response::parse("Strongly agree"))]);

        let mut timings = Timings::default();
        timings.record(
            SiteKey::new("https://a.org", Platform::Desktop),
            TimingTest::RecallButton,
            7.5,
        );

        let sites = [
            info("https://a.org", Platform::Desktop),
            info("https://b.org", Platform::Mobile),
        ];
        let rows = combine(&sites, &survey, &timings, &[Question::ButtonDiscover]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].likert, vec![2.0]);
        assert_eq!(rows[0].timings, vec![0.0, 7.5, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(rows[1].key.site, "https://b.org");
        assert_eq!(rows[1].likert, vec![0.0]);
        assert!(rows[1].timings.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_write_dataset_csv() {
        let sites = [info("https://a.org", Platform::Mobile)];
        let rows = combine(&sites, &Survey::default(), &Timings::default(), &[Question::TextDiscover]);

        let mut buf = Vec::new();
        write_dataset_csv(&rows, &[Question::TextDiscover], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(&header[..3], &["URL", "Platform", "Size_text"]);
        assert!(header.contains(&"text-discover"));
        assert_eq!(header.last(), Some(&"recall_explainer_time"));
        assert_eq!(header.len(), 2 + feature_columns().len() + 1 + TimingTest::ALL.len());

        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(&row[..4], &["https://a.org", "Mobile", "0", "1"]);
        assert_eq!(row.len(), header.len());
    }
}

use serde::Serialize;

/// Display rating for a clinic.
///
/// `average_of_shown` covers only the reviews loaded for display;
/// `total_count` comes from a separate count over every active review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_of_shown: f64,
    pub shown_count: usize,
    pub total_count: i64,
}

impl RatingSummary {
    pub fn new(shown: &[i32], total_count: i64) -> Self {
        Self {
            average_of_shown: average_rating(shown),
            shown_count: shown.len(),
            total_count,
        }
    }
}

/// Mean of `ratings` rounded to one decimal; zero when empty.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    round1(sum as f64 / ratings.len() as f64)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_three() {
        assert_eq!(average_rating(&[5, 3, 4]), 4.0);
    }

    #[test]
    fn no_reviews_is_zero() {
        let avg = average_rating(&[]);
        assert_eq!(avg, 0.0);
        assert!(!avg.is_nan());
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(average_rating(&[5, 4, 4]), 4.3);
        assert_eq!(average_rating(&[5, 5, 4]), 4.7);
        assert_eq!(average_rating(&[1, 2]), 1.5);
    }

    #[test]
    fn summary_keeps_shown_and_total_apart() {
        let shown = [5; 10];
        let s = RatingSummary::new(&shown, 37);
        assert_eq!(s.average_of_shown, 5.0);
        assert_eq!(s.shown_count, 10);
        assert_eq!(s.total_count, 37);

        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["averageOfShown"], 5.0);
        assert_eq!(json["shownCount"], 10);
        assert_eq!(json["totalCount"], 37);
    }
}

//! Daily price-limit brackets.
//!
//! A closing price maps to the maximum distance the next session's price may
//! move from it. Brackets are half-open `[previous bound, bound)`; the last
//! one is unbounded.

/// `(exclusive upper bound of closing price, permitted deviation)`
const PRICE_LIMIT_BRACKETS: [(f64, f64); 33] = [
    (100.0, 30.0),
    (200.0, 50.0),
    (500.0, 80.0),
    (700.0, 100.0),
    (1_000.0, 150.0),
    (1_500.0, 300.0),
    (2_000.0, 400.0),
    (3_000.0, 500.0),
    (5_000.0, 700.0),
    (7_000.0, 1_000.0),
    (10_000.0, 1_500.0),
    (15_000.0, 3_000.0),
    (20_000.0, 4_000.0),
    (30_000.0, 5_000.0),
    (50_000.0, 7_000.0),
    (70_000.0, 10_000.0),
    (100_000.0, 15_000.0),
    (150_000.0, 30_000.0),
    (200_000.0, 40_000.0),
    (300_000.0, 50_000.0),
    (500_000.0, 70_000.0),
    (700_000.0, 100_000.0),
    (1_000_000.0, 150_000.0),
    (1_500_000.0, 300_000.0),
    (2_000_000.0, 400_000.0),
    (3_000_000.0, 500_000.0),
    (5_000_000.0, 700_000.0),
    (7_000_000.0, 1_000_000.0),
    (10_000_000.0, 1_500_000.0),
    (15_000_000.0, 3_000_000.0),
    (20_000_000.0, 4_000_000.0),
    (30_000_000.0, 5_000_000.0),
    (50_000_000.0, 7_000_000.0),
];

const UNBOUNDED_DEVIATION: f64 = 10_000_000.0;

/// Maximum permitted deviation for a non-negative closing price.
pub fn price_limit_deviation(closing_price: f64) -> f64 {
    PRICE_LIMIT_BRACKETS
        .iter()
        .find(|(bound, _)| closing_price < *bound)
        .map(|(_, deviation)| *deviation)
        .unwrap_or(UNBOUNDED_DEVIATION)
}

/// Highest price the instrument may trade at in the next session.
pub fn upper_price_limit(closing_price: f64) -> f64 {
    closing_price + price_limit_deviation(closing_price)
}

//! The shared filter / advanced-search / sort / paginate pipeline behind
//! every list view.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{NumberRecord, NumberType, RtsStatus, UploadStatus};

/// Default page size when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Digit-pattern search over a mobile number. Every populated criterion
/// must hold for a number to match.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedSearch {
    /// Leading digits.
    pub start_with: Option<String>,
    /// Trailing digits.
    pub end_with: Option<String>,
    /// A digit run appearing anywhere.
    pub anywhere: Option<String>,
    /// Digit runs that must all appear, in the order listed.
    pub must_contain: Vec<String>,
    /// Digit runs that must not appear at all.
    pub not_contain: Vec<String>,
    /// When set, the number may use only these digits.
    pub only_contain: Option<String>,
    /// Exact digit sum (plain sum, not the digital root).
    pub total: Option<u32>,
    /// Exact digital root.
    pub sum: Option<u32>,
    /// Upper bound on how often any single digit repeats.
    pub max_repetition: Option<u32>,
}

impl AdvancedSearch {
    /// True when no criterion is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start_with.is_none()
            && self.end_with.is_none()
            && self.anywhere.is_none()
            && self.must_contain.is_empty()
            && self.not_contain.is_empty()
            && self.only_contain.is_none()
            && self.total.is_none()
            && self.sum.is_none()
            && self.max_repetition.is_none()
    }

    /// Tests one mobile against every populated criterion.
    #[must_use]
    pub fn matches(&self, mobile: &str) -> bool {
        if let Some(prefix) = self.start_with.as_deref() {
            if !mobile.starts_with(prefix) {
                return false;
            }
        }
        if let Some(suffix) = self.end_with.as_deref() {
            if !mobile.ends_with(suffix) {
                return false;
            }
        }
        if let Some(run) = self.anywhere.as_deref() {
            if !mobile.contains(run) {
                return false;
            }
        }
        if !self.must_contain.is_empty() && !contains_in_order(mobile, &self.must_contain) {
            return false;
        }
        if self.not_contain.iter().any(|run| mobile.contains(run)) {
            return false;
        }
        if let Some(allowed) = self.only_contain.as_deref() {
            if !mobile.chars().all(|c| allowed.contains(c)) {
                return false;
            }
        }
        if let Some(total) = self.total {
            if digit_sum(mobile) != total {
                return false;
            }
        }
        if let Some(root) = self.sum {
            if digital_root(mobile) != root {
                return false;
            }
        }
        if let Some(cap) = self.max_repetition {
            if max_digit_repetition(mobile) > cap {
                return false;
            }
        }
        true
    }
}

/// Each run must appear, and later runs must start after the end of the
/// previous match. `["1", "4"]` matches `9814567890` but not `9876543210`,
/// where the 4 comes before the 1.
fn contains_in_order(mobile: &str, runs: &[String]) -> bool {
    let mut from = 0;
    for run in runs {
        match mobile[from..].find(run.as_str()) {
            Some(pos) => from += pos + run.len(),
            None => return false,
        }
    }
    true
}

fn digit_sum(mobile: &str) -> u32 {
    mobile.chars().filter_map(|c| c.to_digit(10)).sum()
}

fn digital_root(mobile: &str) -> u32 {
    let mut n = digit_sum(mobile);
    while n >= 10 {
        let mut folded = 0;
        while n > 0 {
            folded += n % 10;
            n /= 10;
        }
        n = folded;
    }
    n
}

fn max_digit_repetition(mobile: &str) -> u32 {
    let mut counts = [0u32; 10];
    for d in mobile.chars().filter_map(|c| c.to_digit(10)) {
        counts[d as usize] += 1;
    }
    counts.into_iter().max().unwrap_or(0)
}

/// Column to order a number listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Serial number.
    SrNo,
    /// The mobile itself, lexicographic.
    Mobile,
    /// Digital root.
    Sum,
    /// Plain digit sum.
    DigitSum,
    /// Purchase price.
    PurchasePrice,
    /// Sale price.
    SalePrice,
    /// Purchase date.
    PurchaseDate,
    /// RTS date; numbers without one sort last.
    RtsDate,
    /// Safe-custody date; numbers without one sort last.
    SafeCustodyDate,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDir {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// Parameters of one number listing request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumberQuery {
    /// Substring match on the mobile.
    pub search: Option<String>,
    /// RTS status equality filter.
    pub status: Option<RtsStatus>,
    /// Number type equality filter.
    pub number_type: Option<NumberType>,
    /// Upload status equality filter.
    pub upload_status: Option<UploadStatus>,
    /// Digit-pattern criteria.
    #[serde(flatten)]
    pub advanced: AdvancedSearch,
    /// Sort column; unsorted (serial order) when absent.
    pub sort_by: Option<SortKey>,
    /// Sort direction.
    pub sort_dir: SortDir,
    /// 1-based page index.
    pub page: Option<usize>,
    /// Page size.
    pub per_page: Option<usize>,
}

/// One page of a filtered listing, with the overall totals the pager needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The rows of this page.
    pub records: Vec<T>,
    /// Matching rows across all pages.
    pub total: usize,
    /// 1-based page index.
    pub page: usize,
    /// Page size used.
    pub per_page: usize,
    /// Number of pages.
    pub total_pages: usize,
}

impl NumberQuery {
    /// Runs the full pipeline: filter, advanced search, sort, paginate.
    #[must_use]
    pub fn apply(&self, numbers: &[NumberRecord]) -> Page<NumberRecord> {
        let mut rows: Vec<NumberRecord> = numbers
            .iter()
            .filter(|n| self.filter(n))
            .cloned()
            .collect();

        if let Some(key) = self.sort_by {
            let dir = self.sort_dir;
            rows.sort_by(|a, b| compare(a, b, key, dir));
        }

        let total = rows.len();
        let per_page = self.per_page.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = self.page.unwrap_or(1).max(1);
        let total_pages = total.div_ceil(per_page);
        let records = rows
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        Page {
            records,
            total,
            page,
            per_page,
            total_pages,
        }
    }

    fn filter(&self, number: &NumberRecord) -> bool {
        let d = &number.details;
        if let Some(search) = self.search.as_deref() {
            if !d.mobile.as_str().contains(search) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != d.status) {
            return false;
        }
        if self.number_type.is_some_and(|t| t != d.number_type) {
            return false;
        }
        if self.upload_status.is_some_and(|u| u != d.upload_status) {
            return false;
        }
        self.advanced.is_empty() || self.advanced.matches(d.mobile.as_str())
    }
}

/// Missing values sort after present ones regardless of direction; only the
/// comparison between two present values is reversed for descending.
fn compare_opt<T, F>(a: Option<T>, b: Option<T>, dir: SortDir, cmp: F) -> Ordering
where
    F: Fn(&T, &T) -> Ordering,
{
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => apply_dir(cmp(&a, &b), dir),
    }
}

fn apply_dir(ord: Ordering, dir: SortDir) -> Ordering {
    match dir {
        SortDir::Asc => ord,
        SortDir::Desc => ord.reverse(),
    }
}

fn compare(a: &NumberRecord, b: &NumberRecord, key: SortKey, dir: SortDir) -> Ordering {
    let (a, b) = (&a.details, &b.details);
    match key {
        SortKey::SrNo => apply_dir(a.sr_no.cmp(&b.sr_no), dir),
        SortKey::Mobile => apply_dir(a.mobile.as_str().cmp(b.mobile.as_str()), dir),
        SortKey::Sum => apply_dir(a.sum.cmp(&b.sum), dir),
        SortKey::DigitSum => apply_dir(
            digit_sum(a.mobile.as_str()).cmp(&digit_sum(b.mobile.as_str())),
            dir,
        ),
        SortKey::PurchasePrice => apply_dir(a.purchase_price.total_cmp(&b.purchase_price), dir),
        SortKey::SalePrice => apply_dir(a.sale_price.total_cmp(&b.sale_price), dir),
        SortKey::PurchaseDate => apply_dir(a.purchase_date.cmp(&b.purchase_date), dir),
        SortKey::RtsDate => compare_opt(a.rts_date, b.rts_date, dir, Ord::cmp),
        SortKey::SafeCustodyDate => {
            compare_opt(a.safe_custody_date, b.safe_custody_date, dir, Ord::cmp)
        }
    }
}

//! Numeric-aware string ordering: `page2` < `page10`.

use std::cmp::Ordering;

/// Case-insensitive comparison where runs of ASCII digits compare by value.
///
/// Equal-valued digit runs with different zero padding order the shorter run
/// first. Strings that compare equal under those rules fall back to plain byte
/// order so the result is total and stable.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    compare_folded(a.as_bytes(), b.as_bytes()).then_with(|| a.cmp(b))
}

fn compare_folded(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let ea = digit_run_end(a, i);
            let eb = digit_run_end(b, j);
            let ord = compare_digit_runs(&a[i..ea], &b[j..eb]);
            if ord != Ordering::Equal {
                return ord;
            }
            i = ea;
            j = eb;
            continue;
        }
        let ord = a[i].to_ascii_lowercase().cmp(&b[j].to_ascii_lowercase());
        if ord != Ordering::Equal {
            return ord;
        }
        i += 1;
        j += 1;
    }
    (a.len() - i).cmp(&(b.len() - j))
}

fn digit_run_end(s: &[u8], start: usize) -> usize {
    s[start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(s.len(), |n| start + n)
}

fn compare_digit_runs(a: &[u8], b: &[u8]) -> Ordering {
    let ta = trim_zeros(a);
    let tb = trim_zeros(b);
    // no overflow: longer significant run is larger
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

fn trim_zeros(s: &[u8]) -> &[u8] {
    let n = s.iter().take_while(|&&c| c == b'0').count();
    &s[n..]
}

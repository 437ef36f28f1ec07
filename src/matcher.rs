// Trace alignment: enumerate order-preserving, shape-equal index pairings
// between two pair sequences. Grounded on the original tool's
// `matching_helper.py`, which explored the same search space recursively;
// this implementation memoizes per-element candidates and emits alignments
// strictly length-descending, all solutions of a length before the next.
//
// SPEC_FULL.md §4.2/§9 records the choice of handcrafted backtracking over
// an SMT encoding: no example in this corpus pulls in a solver crate, and
// the constraint set here (strict monotonicity, small-integer membership)
// doesn't need one.

use crate::http::Pair;

/// An alignment: `(i, j)` pairs with strictly increasing `i` and `j`, each
/// `similar(A[i], B[j])`.
pub type Alignment = Vec<(usize, usize)>;

/// Two pairs are similar iff method, scheme/host/port, path-segment count,
/// and query-parameter count all match. Path content, query values, and
/// fragments are intentionally ignored.
pub fn similar(a: &Pair, b: &Pair) -> bool {
    if a.request.method != b.request.method {
        return false;
    }
    let (ua, ub) = match (a.request.parsed_url(), b.request.parsed_url()) {
        (Some(ua), Some(ub)) => (ua, ub),
        _ => return false,
    };
    if ua.scheme() != ub.scheme() || ua.host_str() != ub.host_str() || ua.port_or_known_default() != ub.port_or_known_default() {
        return false;
    }
    if a.request.path_segments().len() != b.request.path_segments().len() {
        return false;
    }
    a.request.query_params().len() == b.request.query_params().len()
}

/// Enumerates every alignment between `a` and `b`, longest length first,
/// all solutions of a given length before any shorter one.
pub struct Matcher<'a> {
    a: &'a [Pair],
    b: &'a [Pair],
    /// `candidates[i]` = indices `j` into `b` with `similar(a[i], b[j])`.
    candidates: Vec<Vec<usize>>,
}

impl<'a> Matcher<'a> {
    pub fn new(a: &'a [Pair], b: &'a [Pair]) -> Self {
        let candidates = a
            .iter()
            .map(|pa| b.iter().enumerate().filter(|(_, pb)| similar(pa, pb)).map(|(j, _)| j).collect())
            .collect();
        Self { a, b, candidates }
    }

    /// All alignments, longest-first; within a length, in the order a
    /// depth-first search over strictly increasing `(i, j)` choices visits
    /// them.
    pub fn alignments(&self) -> Vec<Alignment> {
        let max_len = self.a.len().min(self.b.len());
        let mut out = Vec::new();
        for len in (1..=max_len).rev() {
            let mut found = Vec::new();
            self.search(0, 0, len, &mut Vec::new(), &mut found);
            out.extend(found);
        }
        out
    }

    /// Depth-first search for length-`remaining` alignments starting no
    /// earlier than `from_a` in `A` and `from_b` in `B`.
    fn search(&self, from_a: usize, from_b: usize, remaining: usize, current: &mut Alignment, out: &mut Vec<Alignment>) {
        if remaining == 0 {
            out.push(current.clone());
            return;
        }
        if self.a.len() - from_a < remaining {
            return;
        }
        for i in from_a..self.a.len() {
            if self.a.len() - i < remaining {
                break;
            }
            for &j in &self.candidates[i] {
                if j < from_b {
                    continue;
                }
                current.push((i, j));
                self.search(i + 1, j + 1, remaining - 1, current, out);
                current.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use indexmap::IndexMap;

    fn pair(method: &str, url: &str) -> Pair {
        Pair::new(
            HttpRequest::new(method, url, "HTTP/1.1", IndexMap::new(), Vec::new()),
            HttpResponse::new(200, "OK", "HTTP/1.1", IndexMap::new(), Vec::new(), Vec::new()),
        )
    }

    #[test]
    fn s1_trivial_single_alignment() {
        let a = vec![pair("GET", "http://a.com/")];
        let b = vec![pair("GET", "http://a.com/")];
        let m = Matcher::new(&a, &b);
        let aligns = m.alignments();
        assert_eq!(aligns, vec![vec![(0, 0)]]);
    }

    #[test]
    fn s2_two_singletons_three_alignments() {
        let a = vec![pair("GET", "http://a.com/"), pair("GET", "http://b.com/")];
        let b = vec![pair("GET", "http://a.com/"), pair("GET", "http://b.com/")];
        let m = Matcher::new(&a, &b);
        let aligns = m.alignments();
        assert_eq!(aligns.len(), 3);
        assert_eq!(aligns[0].len(), 2);
        assert_eq!(aligns[1].len(), 1);
        assert_eq!(aligns[2].len(), 1);
    }

    #[test]
    fn s3_swap_two_alignments() {
        let a = vec![pair("GET", "http://b.com/"), pair("GET", "http://a.com/")];
        let b = vec![pair("GET", "http://a.com/"), pair("GET", "http://b.com/")];
        let m = Matcher::new(&a, &b);
        let aligns = m.alignments();
        assert_eq!(aligns.len(), 2);
        assert!(aligns.iter().all(|al| al.len() == 1));
    }

    #[test]
    fn s4_multi_path_35_alignments() {
        let a = vec![
            pair("GET", "http://h.com/a/1"),
            pair("GET", "http://h.com/a/2"),
            pair("GET", "http://h.com/b/1"),
            pair("GET", "http://h.com/b/2"),
        ];
        let b = vec![
            pair("GET", "http://h.com/a/a"),
            pair("GET", "http://h.com/a/b"),
            pair("GET", "http://h.com/b/a"),
            pair("GET", "http://h.com/b/b"),
        ];
        let m = Matcher::new(&a, &b);
        assert_eq!(m.alignments().len(), 35);
    }

    #[test]
    fn s7_medium_count_eleven() {
        let a = vec![
            pair("GET", "http://a.com/"),
            pair("GET", "http://b.com/"),
            pair("GET", "http://c.com/"),
            pair("GET", "http://d.com/"),
        ];
        let b = vec![
            pair("GET", "http://a.com/"),
            pair("GET", "http://b.com/"),
            pair("GET", "http://d.com/"),
            pair("GET", "http://c.com/"),
        ];
        let m = Matcher::new(&a, &b);
        assert_eq!(m.alignments().len(), 11);
    }

    #[test]
    fn s7_chaotic_count_thirty_nine() {
        let a = vec![
            pair("GET", "http://a.com/1"),
            pair("GET", "http://a.com/2"),
            pair("GET", "http://b.com/"),
            pair("GET", "http://c.com/1"),
            pair("GET", "http://c.com/2"),
            pair("GET", "http://a.com/3"),
        ];
        let b = vec![
            pair("GET", "http://a.com/a"),
            pair("GET", "http://a.com/b"),
            pair("GET", "http://d.com/"),
            pair("GET", "http://c.com/a"),
            pair("GET", "http://c.com/b"),
        ];
        let m = Matcher::new(&a, &b);
        assert_eq!(m.alignments().len(), 39);
    }

    #[test]
    fn alignments_are_length_descending_and_unique() {
        let a = vec![pair("GET", "http://a.com/"), pair("GET", "http://a.com/x")];
        let b = vec![pair("GET", "http://a.com/"), pair("GET", "http://a.com/y")];
        let m = Matcher::new(&a, &b);
        let aligns = m.alignments();
        for w in aligns.windows(2) {
            assert!(w[0].len() >= w[1].len());
        }
        let unique: std::collections::HashSet<_> = aligns.iter().cloned().collect();
        assert_eq!(unique.len(), aligns.len());
        for al in &aligns {
            for w in al.windows(2) {
                assert!(w[0].0 < w[1].0 && w[0].1 < w[1].1);
            }
            for &(i, j) in al {
                assert!(similar(&a[i], &b[j]));
            }
        }
    }
}

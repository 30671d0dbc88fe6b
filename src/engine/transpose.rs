//! Transposable-element mutation.
//!
//! Moves or copies a sub-range of a sequence to another position, optionally
//! reversed, mimicking DNA transposons. Works on any cloneable element type.

/// Move (or, if `replicative`, copy) the half-open range `[start, end)` of
/// `seq` to position `dst`, in place. If `inverted`, the transposed segment
/// is inserted reversed.
///
/// Out-of-range indices are clamped to the sequence length, so any triple is
/// accepted. When `dst` lies outside `[start, end)` the operation is a clean
/// move/copy: the non-replicative form preserves length and element multiset,
/// the replicative form grows the sequence by exactly `end - start`.
///
/// When `dst` lies strictly inside `[start, end)` the result is still
/// deterministic but NOT multiset-preserving: the insert happens before the
/// cut, so some elements duplicate and others vanish. Downstream mutation
/// statistics rely on this exact insert-then-delete ordering; do not
/// special-case it.
pub fn transpose<T: Clone>(
    seq: &mut Vec<T>,
    start: usize,
    end: usize,
    dst: usize,
    replicative: bool,
    inverted: bool,
) {
    let s = start.min(seq.len());
    let e = end.min(seq.len()).max(s);
    let segment: Vec<T> = seq[s..e].to_vec();

    // Inserting element-by-element at a fixed index reverses the segment,
    // so the forward iteration produces the inverted layout and the reverse
    // iteration the straight one. Insertions past the end append instead.
    if inverted {
        for item in segment.iter() {
            let at = dst.min(seq.len());
            seq.insert(at, item.clone());
        }
    } else {
        for item in segment.iter().rev() {
            let at = dst.min(seq.len());
            seq.insert(at, item.clone());
        }
    }

    if !replicative {
        let segment_len = end.saturating_sub(start);
        let cut_start = if dst < start { start + segment_len } else { start };
        let cs = cut_start.min(seq.len());
        let ce = (cut_start + segment_len).min(seq.len()).max(cs);
        seq.drain(cs..ce);
    }
}

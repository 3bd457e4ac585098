use rand::seq::index;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Highlight {
    pub start: u32,
    pub length: u32,
}

/// Start offsets of consecutive `window`-second slices of a `total`-second source.
pub(crate) fn window_starts(total: f64, window: f64) -> Vec<f64> {
    if !(total > 0.0 && window > 0.0) {
        return Vec::new();
    }
    (0..)
        .map(|i| i as f64 * window)
        .take_while(|start| *start < total)
        .collect()
}

/// Picks `count` highlights with lengths in `min_len..=max_len` and distinct
/// whole-second start times, sorted by start.
pub(crate) fn pick_highlights<R: Rng + ?Sized>(
    rng: &mut R,
    source_len: f64,
    count: usize,
    min_len: u32,
    max_len: u32,
) -> anyhow::Result<Vec<Highlight>> {
    if min_len == 0 || min_len > max_len {
        return Err(anyhow::anyhow!("Invalid highlight length range {min_len}..={max_len}"));
    }
    let lengths: Vec<u32> = (0..count).map(|_| rng.gen_range(min_len..=max_len)).collect();
    let longest = lengths.iter().copied().max().unwrap_or(0);

    let latest_start = (source_len.floor() as i64 - i64::from(longest)).max(0) as usize;
    if latest_start < count {
        return Err(anyhow::anyhow!(
            "Source of {source_len:.1}s is too short for {count} highlights of up to {longest}s"
        ));
    }

    let mut starts = index::sample(rng, latest_start, count).into_vec();
    starts.sort_unstable();

    Ok(starts
        .into_iter()
        .zip(lengths)
        .map(|(start, length)| Highlight {
            start: start as u32,
            length,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn windows_cover_the_source() {
        assert_eq!(window_starts(150.0, 60.0), vec![0.0, 60.0, 120.0]);
        assert_eq!(window_starts(120.0, 60.0), vec![0.0, 60.0]);
        assert_eq!(window_starts(10.0, 60.0), vec![0.0]);
        assert!(window_starts(0.0, 60.0).is_empty());
    }

    #[test]
    fn highlights_fit_inside_the_source() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let picks = pick_highlights(&mut rng, 60.0, 3, 8, 14).unwrap();
            assert_eq!(picks.len(), 3);
            assert!(picks.windows(2).all(|pair| pair[0].start < pair[1].start));
            for pick in &picks {
                assert!((8..=14).contains(&pick.length));
                assert!(pick.start + pick.length <= 60);
            }
        }
    }

    #[test]
    fn highlights_are_reproducible() {
        let first = pick_highlights(&mut StdRng::seed_from_u64(9), 60.0, 3, 8, 14).unwrap();
        let second = pick_highlights(&mut StdRng::seed_from_u64(9), 60.0, 3, 8, 14).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn short_source_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(pick_highlights(&mut rng, 12.0, 3, 8, 14).is_err());
        assert!(pick_highlights(&mut rng, 60.0, 3, 14, 8).is_err());
    }
}

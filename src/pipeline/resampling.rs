//! Stratified k-fold cross-validation splits

use anyhow::Result;
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold over 0/1 labels.
///
/// Indices are shuffled within each class, then dealt round-robin into the
/// folds. The deal continues across classes so fold sizes differ by at most
/// one. Requires `2 <= k <= minority class size`.
pub fn stratified_kfold(y: &Array1<f64>, k: usize, seed: u64) -> Result<Vec<CvSplit>> {
    if k < 2 {
        anyhow::bail!("Number of folds must be at least 2, got {}", k);
    }

    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (idx, &label) in y.iter().enumerate() {
        by_class[usize::from(label >= 0.5)].push(idx);
    }
    let minority = by_class[0].len().min(by_class[1].len());
    if minority < k {
        anyhow::bail!(
            "{} folds need at least {} samples per class, smallest class has {}",
            k,
            k,
            minority
        );
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut slot = 0;
    for members in by_class.iter_mut() {
        members.shuffle(&mut rng);
        for &idx in members.iter() {
            folds[slot % k].push(idx);
            slot += 1;
        }
    }

    let splits = (0..k)
        .map(|fold_idx| {
            let mut test_indices = folds[fold_idx].clone();
            test_indices.sort_unstable();
            let mut train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            train_indices.sort_unstable();
            CvSplit {
                train_indices,
                test_indices,
                fold_idx,
            }
        })
        .collect();

    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_neg: usize, n_pos: usize) -> Array1<f64> {
        Array1::from_shape_fn(n_neg + n_pos, |i| if i < n_neg { 0.0 } else { 1.0 })
    }

    #[test]
    fn test_every_index_tested_once() {
        let y = labels(23, 9);
        let splits = stratified_kfold(&y, 4, 3).unwrap();

        let mut seen = vec![0usize; y.len()];
        for split in &splits {
            for &i in &split.test_indices {
                seen[i] += 1;
                assert!(!split.train_indices.contains(&i));
            }
            assert_eq!(split.train_indices.len() + split.test_indices.len(), y.len());
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_each_fold_has_both_classes() {
        let y = labels(20, 5);
        for split in stratified_kfold(&y, 5, 11).unwrap() {
            let pos = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(pos, 1);
            assert_eq!(split.test_indices.len(), 5);
        }
    }

    #[test]
    fn test_seeded_splits_repeat() {
        let y = labels(12, 12);
        let a = stratified_kfold(&y, 3, 5).unwrap();
        let b = stratified_kfold(&y, 3, 5).unwrap();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }

    #[test]
    fn test_rejects_too_many_folds() {
        assert!(stratified_kfold(&labels(10, 3), 4, 0).is_err());
        assert!(stratified_kfold(&labels(10, 10), 1, 0).is_err());
    }
}

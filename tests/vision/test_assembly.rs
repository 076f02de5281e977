// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Fragment assembly: confidence floor, mean and length check

use plate_reader::vision::plate::{TextAssembler, TextFragment};

#[cfg(test)]
mod assembly_tests {
    use super::*;

    fn frags(items: &[(&str, f32)]) -> Vec<TextFragment> {
        items.iter().map(|(t, c)| TextFragment::new(*t, *c)).collect()
    }

    #[test]
    fn test_confidence_is_mean_of_surviving_fragments() {
        let cases: Vec<Vec<(&str, f32)>> = vec![
            vec![("KA01", 0.9), ("AB", 0.6), ("1234", 0.3)],
            vec![("KA01", 0.9), ("AB", 0.29), ("1234", 0.7)],
            vec![("X", 0.05), ("HR26DK8337", 0.45)],
            vec![("MH", 1.0), ("12", 1.0), ("DE", 0.31), ("1433", 0.99)],
        ];
        let assembler = TextAssembler::default();

        for case in cases {
            let fragments = frags(&case);
            let surviving: Vec<f32> = case.iter().map(|(_, c)| *c).filter(|c| *c >= 0.3).collect();
            let expected = surviving.iter().sum::<f32>() / surviving.len() as f32;

            let out = assembler.assemble(&fragments);
            assert!(!out.text.is_empty(), "{:?}", case);
            assert!((out.confidence - expected).abs() < 1e-6, "{:?}", case);
        }
    }

    #[test]
    fn test_nothing_survives_gives_empty() {
        let out = TextAssembler::default().assemble(&frags(&[("KA01AB1234", 0.2)]));
        assert_eq!(out.text, "");
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn test_order_is_preserved() {
        let out = TextAssembler::default().assemble(&frags(&[("1234", 0.8), ("KA01", 0.8)]));
        assert_eq!(out.text, "1234KA01");
    }

    #[test]
    fn test_exactly_min_length_accepted() {
        let out = TextAssembler::default().assemble(&frags(&[("AB", 0.8), ("1-2", 0.8)]));
        assert_eq!(out.text, "AB12");

        let out = TextAssembler::default().assemble(&frags(&[("AB", 0.8), ("1-", 0.8)]));
        assert_eq!(out.text, "");
    }
}

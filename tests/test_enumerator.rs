//! 批次枚举测试: 不相交性、顺序、边界提示

mod common;

use common::{brute_force_indexes, enumeration_context, expand_all_batches, within_hints};
use mpq_name_breaker::Charset;
use mpq_name_breaker::enumerator::Enumerator;
use mpq_name_breaker::hints::HintBounds;
use pretty_assertions::assert_eq;

fn letters() -> Charset {
    Charset::new("ABCDEFGHIJKLMNOPQRSTUVWXYZ", "").unwrap()
}

#[test]
fn test_batches_enumerate_every_string_once_in_order() {
    let charset = Charset::new("ABC", "").unwrap();
    for batch_char_count in 1..=3 {
        for batch_size in [1, 2, 5, 64] {
            let ctx = enumeration_context(&charset, HintBounds::none(), batch_char_count, 5);
            let produced = expand_all_batches(&ctx, batch_size);
            assert_eq!(
                produced,
                brute_force_indexes(3, 5),
                "c = {}, batch size = {}",
                batch_char_count,
                batch_size
            );
        }
    }
}

#[test]
fn test_order_is_strictly_increasing() {
    let charset = Charset::new("ABCD", "").unwrap();
    let ctx = enumeration_context(&charset, HintBounds::none(), 2, 6);
    let produced = expand_all_batches(&ctx, 7);
    for pair in produced.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!((a.len(), a) < (b.len(), b), "{:?} >= {:?}", a, b);
    }
    assert_eq!(produced.len(), 4 + 16 + 64 + 256 + 1024 + 4096);
}

#[test]
fn test_single_char_hints_select_sub_range() {
    let charset = letters();
    let hints = HintBounds::new(&charset, "B", "Y").unwrap();
    let ctx = enumeration_context(&charset, hints, 1, 3);
    let produced = expand_all_batches(&ctx, 32);

    let b = charset.index_of(b'B').unwrap();
    let y = charset.index_of(b'Y').unwrap();
    let expected: Vec<Vec<u8>> = brute_force_indexes(26, 3)
        .into_iter()
        .filter(|name| within_hints(name, &[b], &[y]))
        .collect();
    assert_eq!(produced, expected);
    assert!(produced.iter().all(|name| name[0] >= b && name[0] <= y));
}

#[test]
fn test_multi_char_hints_select_sub_range() {
    let charset = Charset::new("ABCDE", "").unwrap();
    for (before, after) in [("BC", "DB"), ("AE", "EA"), ("CC", "CD"), ("B", "")] {
        let hints = HintBounds::new(&charset, before, after).unwrap();
        for batch_char_count in 1..=2 {
            let ctx = enumeration_context(&charset, hints, batch_char_count, 4);
            let produced = expand_all_batches(&ctx, 3);
            let expected: Vec<Vec<u8>> = brute_force_indexes(5, 4)
                .into_iter()
                .filter(|name| within_hints(name, hints.before(), hints.after()))
                .collect();
            assert_eq!(
                produced, expected,
                "before {:?}, after {:?}, c = {}",
                before, after, batch_char_count
            );
        }
    }
}

#[test]
fn test_smallest_configuration_terminates() {
    // 字符集大小 2, 每批次 1 个种子, 每个种子 1 个字符
    let charset = Charset::new("01", "").unwrap();
    let ctx = enumeration_context(&charset, HintBounds::none(), 1, 16);
    let mut enumerator = Enumerator::new(2, HintBounds::none(), 1, 16).unwrap();
    let mut batches = 0u64;
    let mut names = 0u64;
    while let Some(batch) = enumerator.next_batch(1) {
        assert_eq!(batch.len(), 1);
        names += common::expand_batch(&ctx, &batch).len() as u64;
        batches += 1;
    }
    assert!(enumerator.is_exhausted());
    // 种子长度 1..=15: 2^16 - 2 个
    assert_eq!(batches, (1 << 16) - 2);
    // 长度 1..=16 的全部字符串
    assert_eq!(names, (1 << 17) - 2);
}

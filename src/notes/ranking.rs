//! 名次计算
//!
//! 按平均分降序稳定排序，非数值排在最后，同分再按姓名顺序。
//! 并列按给定小数位取整后的数值判定，名次 = 1 + 严格更好的人数。

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{Average, Rank};

/// 一组名次及参与排名的人数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankTable {
    pub ranks: BTreeMap<i64, Rank>,
    /// 有数值平均分的人数
    pub size: usize,
}

impl RankTable {
    pub fn get(&self, student_id: i64) -> Option<Rank> {
        self.ranks.get(&student_id).copied()
    }
}

fn tie_key(average: &Average, precision: u32) -> Option<i64> {
    let scale = 10f64.powi(precision as i32);
    average.value().map(|v| (v * scale).round() as i64)
}

/// 排序：平均分降序（非数值最后），再按 `alpha_order` 中的位置
pub fn sort_by_average(entries: &mut [(i64, Average)], alpha_order: &HashMap<i64, usize>) {
    entries.sort_by(|(id_a, a), (id_b, b)| {
        a.cmp_desc(b).then_with(|| {
            let pa = alpha_order.get(id_a).copied().unwrap_or(usize::MAX);
            let pb = alpha_order.get(id_b).copied().unwrap_or(usize::MAX);
            pa.cmp(&pb).then(id_a.cmp(id_b))
        })
    });
}

/// 计算名次
pub fn compute_ranks(
    mut entries: Vec<(i64, Average)>,
    alpha_order: &HashMap<i64, usize>,
    precision: u32,
) -> RankTable {
    sort_by_average(&mut entries, alpha_order);

    let mut table = RankTable {
        ranks: BTreeMap::new(),
        size: entries.iter().filter(|(_, avg)| avg.is_numeric()).count(),
    };

    let mut start = 0;
    while start < entries.len() {
        let key = tie_key(&entries[start].1, precision);
        let mut end = start + 1;
        while end < entries.len() && tie_key(&entries[end].1, precision) == key {
            end += 1;
        }
        let tied = end - start > 1;
        for (student_id, _) in &entries[start..end] {
            table.ranks.insert(
                *student_id,
                Rank {
                    position: (start + 1) as u32,
                    tied,
                },
            );
        }
        start = end;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_alpha() -> HashMap<i64, usize> {
        HashMap::new()
    }

    #[test]
    fn test_simple_ranking() {
        let table = compute_ranks(
            vec![
                (1, Average::Numeric(12.667)),
                (2, Average::Numeric(4.89)),
                (3, Average::Numeric(15.0)),
            ],
            &no_alpha(),
            2,
        );
        assert_eq!(table.get(3), Some(Rank { position: 1, tied: false }));
        assert_eq!(table.get(1), Some(Rank { position: 2, tied: false }));
        assert_eq!(table.get(2), Some(Rank { position: 3, tied: false }));
        assert_eq!(table.size, 3);
    }

    #[test]
    fn test_ties_share_rank() {
        let table = compute_ranks(
            vec![
                (1, Average::Numeric(14.0)),
                (2, Average::Numeric(12.0)),
                (3, Average::Numeric(14.0)),
                (4, Average::Numeric(10.0)),
            ],
            &no_alpha(),
            2,
        );
        assert_eq!(table.get(1), Some(Rank { position: 1, tied: true }));
        assert_eq!(table.get(3), Some(Rank { position: 1, tied: true }));
        assert_eq!(table.get(2), Some(Rank { position: 3, tied: false }));
        assert_eq!(table.get(4), Some(Rank { position: 4, tied: false }));
        assert_eq!(table.get(1).unwrap().to_string(), "1 ex");
    }

    #[test]
    fn test_ties_on_rounded_value() {
        let table = compute_ranks(
            vec![(1, Average::Numeric(12.6666)), (2, Average::Numeric(12.6671))],
            &no_alpha(),
            2,
        );
        assert_eq!(table.get(1), table.get(2));
        assert!(table.get(1).unwrap().tied);
    }

    #[test]
    fn test_non_numeric_last() {
        let table = compute_ranks(
            vec![
                (1, Average::NotAvailable),
                (2, Average::Numeric(3.0)),
                (3, Average::Error),
            ],
            &no_alpha(),
            2,
        );
        assert_eq!(table.get(2).unwrap().position, 1);
        assert_eq!(table.get(1), Some(Rank { position: 2, tied: true }));
        assert_eq!(table.get(3), Some(Rank { position: 2, tied: true }));
        assert_eq!(table.size, 1);
    }

    #[test]
    fn test_monotonic() {
        let values = [11.0, 9.5, 17.25, 9.5, 3.0, 17.25, 12.0];
        let entries: Vec<(i64, Average)> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as i64, Average::Numeric(*v)))
            .collect();
        let table = compute_ranks(entries, &no_alpha(), 2);
        for (i, a) in values.iter().enumerate() {
            for (j, b) in values.iter().enumerate() {
                let ra = table.get(i as i64).unwrap().position;
                let rb = table.get(j as i64).unwrap().position;
                if a > b {
                    assert!(ra <= rb);
                }
                if a == b {
                    assert_eq!(ra, rb);
                }
            }
        }
    }

    #[test]
    fn test_alpha_order_breaks_display_ties() {
        let mut alpha = HashMap::new();
        alpha.insert(7, 0);
        alpha.insert(3, 1);
        let mut entries = vec![(3, Average::Numeric(10.0)), (7, Average::Numeric(10.0))];
        sort_by_average(&mut entries, &alpha);
        assert_eq!(entries[0].0, 7);
    }
}

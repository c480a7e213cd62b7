//! 运动/文化加分函数
//!
//! 运动类 UE 的模块平均分（满分 20）连同模块系数一起交给按名字选择的加分函数，
//! 结果直接加到学期总平均上。

use crate::errors::{Result, ScoDocError};

/// 加分函数所需的上下文
#[derive(Debug, Clone, Copy)]
pub struct BonusContext {
    /// 加分前的总平均
    pub average: f64,
}

pub type BonusFn = fn(notes: &[f64], coefs: &[f64], ctx: &BonusContext) -> f64;

/// 可选加分函数白名单
pub const BONUS_FUNCTIONS: &[(&str, BonusFn)] = &[
    ("bonus_direct", bonus_direct),
    ("bonus_iutv", bonus_iutv),
    ("bonus_iut_stdenis", bonus_iut_stdenis),
    ("bonus_colmar", bonus_colmar),
    ("bonus_iutva", bonus_iutva),
    ("bonus_iut1grenoble_2017", bonus_iut1grenoble_2017),
    ("bonus_nantes", bonus_nantes),
    ("bonus_tours", bonus_tours),
];

pub fn lookup(name: &str) -> Option<BonusFn> {
    BONUS_FUNCTIONS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, f)| *f)
}

/// 解析配置中的函数名，空字符串表示不加分
pub fn resolve(name: &str) -> Result<Option<BonusFn>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    lookup(name).map(Some).ok_or_else(|| {
        ScoDocError::validation(format!("unknown bonus function '{name}'"))
    })
}

/// 计算加分
///
/// 系数之和不为正（且不止一个系数）时加分为 0；只有一个系数时忽略其取值。
pub fn compute(bonus: Option<BonusFn>, notes: &[f64], coefs: &[f64], ctx: &BonusContext) -> f64 {
    let Some(func) = bonus else {
        return 0.0;
    };
    if notes.is_empty() {
        return 0.0;
    }
    if coefs.iter().sum::<f64>() <= 0.0 && coefs.len() != 1 {
        tracing::warn!(
            "invalid or null bonus coefficients {:?} for notes {:?}",
            coefs,
            notes
        );
        return 0.0;
    }
    if coefs.len() == 1 {
        func(notes, &[1.0], ctx)
    } else {
        func(notes, coefs, ctx)
    }
}

/// 分数直接加到总平均，忽略系数
fn bonus_direct(notes: &[f64], _coefs: &[f64], _ctx: &BonusContext) -> f64 {
    notes.iter().sum()
}

/// 每门超过 10 分的部分累加，取 5%
fn bonus_iutv(notes: &[f64], _coefs: &[f64], _ctx: &BonusContext) -> f64 {
    notes.iter().filter(|&&x| x > 10.0).map(|x| (x - 10.0) / 20.0).sum()
}

/// 同上，总加分不超过 0.5
fn bonus_iut_stdenis(notes: &[f64], _coefs: &[f64], _ctx: &BonusContext) -> f64 {
    let points: f64 = notes.iter().filter(|&&x| x > 10.0).map(|x| x - 10.0).sum();
    (points * 0.05).min(0.5)
}

/// 超过 10 分的部分累加（不超过 10 分），取 5%
fn bonus_colmar(notes: &[f64], _coefs: &[f64], _ctx: &BonusContext) -> f64 {
    let points: f64 = notes.iter().filter(|&&x| x > 10.0).map(|x| x - 10.0).sum();
    points.min(10.0) / 20.0
}

/// 按加权平均分档：≥16 加 0.3，≥12 加 0.2，≥10 加 0.1
fn bonus_iutva(notes: &[f64], coefs: &[f64], _ctx: &BonusContext) -> f64 {
    let total: f64 = coefs.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = notes.iter().zip(coefs).map(|(n, c)| n * c).sum::<f64>() / total;
    if weighted >= 16.0 {
        0.3
    } else if weighted >= 12.0 {
        0.2
    } else if weighted >= 10.0 {
        0.1
    } else {
        0.0
    }
}

/// 分数 0 到 5，每 4 分使总平均提高 1%
fn bonus_iut1grenoble_2017(notes: &[f64], _coefs: &[f64], ctx: &BonusContext) -> f64 {
    let points: f64 = notes.iter().sum();
    ctx.average * (points / 4.0) / 100.0
}

/// 分数即加分值，总和不超过 0.5
fn bonus_nantes(notes: &[f64], _coefs: &[f64], _ctx: &BonusContext) -> f64 {
    notes.iter().sum::<f64>().min(0.5)
}

/// 分数即加分值，总和不超过 1
fn bonus_tours(notes: &[f64], _coefs: &[f64], _ctx: &BonusContext) -> f64 {
    notes.iter().sum::<f64>().min(1.0)
}

//! 自定义计算公式
//!
//! 模块和 UE 可以用一条表达式替换默认的加权平均。表达式语法是算术表达式的一个小子集：
//! 数字、字符串、变量、`+ - * / // % **`、比较、`and`/`or`/`not`、`a if c else b`、
//! 列表字面量、下标以及白名单内的内置函数。求值环境只包含显式绑定的变量，
//! 引用任何未知名字都会失败。

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Result, ScoDocError};
use crate::models::{AbsenceCounts, Average};

/// 公式可用的变量
pub const FORMULA_VARIABLES: &[&str] = &[
    "notes",
    "coefs",
    "cmask",
    "moy",
    "moy_valid",
    "moy_is_valid",
    "moy_val",
    "nb_abs",
    "nb_abs_just",
    "nb_abs_nojust",
];

/// 表达式源码的最大长度（字节）
pub const MAX_FORMULA_LENGTH: usize = 2048;

/// 公式可用的内置函数
pub const FORMULA_BUILTINS: &[&str] = &[
    "V", "dot", "max", "min", "abs", "cmp", "len", "pow", "round", "sum", "ifelse", "geomean",
];

static ABSENCE_COUNTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bnb_abs").expect("Invalid absence counter regex"));

/// 表达式为空或以 `#` 开头（注释）时视为未启用
pub fn is_active(source: &str) -> bool {
    let trimmed = source.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// 表达式是否用到缺勤计数
pub fn uses_absences(source: &str) -> bool {
    is_active(source) && ABSENCE_COUNTERS.is_match(source)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Vector(Vec<f64>),
    Text(String),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Vector(_) => "vector",
            Value::Text(_) => "string",
        }
    }

    fn as_number(&self) -> Result<f64> {
        match self {
            Value::Number(v) => Ok(*v),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(ScoDocError::formula(format!(
                "expected a number, got {}",
                other.type_name()
            ))),
        }
    }

    fn as_vector(&self) -> Result<&[f64]> {
        match self {
            Value::Vector(v) => Ok(v),
            other => Err(ScoDocError::formula(format!(
                "expected a vector, got {}",
                other.type_name()
            ))),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Number(v) => *v != 0.0,
            Value::Bool(b) => *b,
            Value::Vector(v) => !v.is_empty(),
            Value::Text(s) => !s.is_empty(),
        }
    }
}

pub type Bindings = HashMap<String, Value>;

/// 公式的输入：每个成分（评测或模块）的成绩、系数与掩码，加上默认平均与缺勤计数
#[derive(Debug, Clone, Default)]
pub struct FormulaInputs {
    pub notes: Vec<f64>,
    pub coefs: Vec<f64>,
    pub cmask: Vec<f64>,
    pub moy: Average,
    pub absences: AbsenceCounts,
}

impl FormulaInputs {
    pub fn bindings(&self) -> Bindings {
        let moy = match self.moy {
            Average::Numeric(v) => Value::Number(v),
            other => Value::Text(other.code().to_string()),
        };
        let valid = self.moy.is_numeric();
        let total = f64::from(self.absences.total);
        let justified = f64::from(self.absences.justified);

        let mut env = Bindings::new();
        env.insert("notes".into(), Value::Vector(self.notes.clone()));
        env.insert("coefs".into(), Value::Vector(self.coefs.clone()));
        env.insert("cmask".into(), Value::Vector(self.cmask.clone()));
        env.insert("moy".into(), moy);
        env.insert("moy_valid".into(), Value::Bool(valid));
        env.insert("moy_is_valid".into(), Value::Bool(valid));
        env.insert("moy_val".into(), Value::Number(self.moy.value_or_zero()));
        env.insert("nb_abs".into(), Value::Number(total));
        env.insert("nb_abs_just".into(), Value::Number(justified));
        env.insert("nb_abs_nojust".into(), Value::Number(total - justified));
        env
    }
}

/// 编译后的公式
#[derive(Debug, Clone)]
pub struct Formula {
    source: String,
    ast: Expr,
}

impl Formula {
    /// 解析并检查名字；未启用的表达式返回 `None`
    pub fn compile(source: &str) -> Result<Option<Formula>> {
        if !is_active(source) {
            return Ok(None);
        }
        if source.len() > MAX_FORMULA_LENGTH {
            return Err(ScoDocError::formula(format!(
                "expression longer than {MAX_FORMULA_LENGTH} bytes"
            )));
        }
        let tokens = tokenize(source)?;
        let ast = Parser::new(tokens).parse()?;
        check_names(&ast)?;
        Ok(Some(Formula {
            source: source.trim().to_string(),
            ast,
        }))
    }

    /// 存储前的校验
    pub fn validate(source: &str) -> Result<()> {
        Self::compile(source).map(|_| ())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval(&self, env: &Bindings) -> Result<Value> {
        eval(&self.ast, env)
    }

    /// 求值并解释为平均分：数值须在 `[0, 20]`，字符串 "NA" 表示不可计算
    pub fn average(&self, inputs: &FormulaInputs) -> Result<Average> {
        match self.eval(&inputs.bindings())? {
            Value::Text(text) if text == "NA" => Ok(Average::NotAvailable),
            Value::Number(v) => check_range(v),
            Value::Bool(b) => check_range(if b { 1.0 } else { 0.0 }),
            other => Err(ScoDocError::formula(format!(
                "formula must return a number or \"NA\", got {}",
                other.type_name()
            ))),
        }
    }
}

fn check_range(v: f64) -> Result<Average> {
    if !v.is_finite() || !(0.0..=20.0).contains(&v) {
        return Err(ScoDocError::formula(format!(
            "average {v} out of range [0, 20]"
        )));
    }
    Ok(Average::Numeric(v))
}

/// 直接对表达式求值
pub fn evaluate(expression: &str, env: &Bindings) -> Result<Value> {
    match Formula::compile(expression)? {
        Some(formula) => formula.eval(env),
        None => Err(ScoDocError::formula("empty expression")),
    }
}

// ---------------------------------------------------------------------------
// 词法

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

const OPERATORS: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "<", ">",
];

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ScoDocError::formula(format!("invalid number '{text}'")))?;
            tokens.push(Token::Number(value));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }
        if c == '"' || c == '\'' {
            let start = i + 1;
            i += 1;
            while i < chars.len() && chars[i] != c {
                i += 1;
            }
            if i >= chars.len() {
                return Err(ScoDocError::formula("unterminated string literal"));
            }
            tokens.push(Token::Str(chars[start..i].iter().collect()));
            i += 1;
            continue;
        }
        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            i += 1;
            continue;
        }
        let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
        match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            Some(op) => {
                tokens.push(Token::Op(*op));
                i += op.len();
            }
            None => {
                return Err(ScoDocError::formula(format!("unexpected character '{c}'")));
            }
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// 语法

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Name(String),
    List(Vec<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    IfElse {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call(String, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
}

const KEYWORDS: &[&str] = &["and", "or", "not", "if", "else", "True", "False"];

/// 括号、下标、一元运算和乘方的最大嵌套层数
const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// 进入一层嵌套，超过上限时直接失败
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(ScoDocError::formula("expression too deeply nested"));
        }
        self.depth += 1;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    fn parse(mut self) -> Result<Expr> {
        let expr = self.expression()?;
        if let Some(token) = self.peek() {
            return Err(ScoDocError::formula(format!("unexpected token {token:?}")));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == keyword)
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ScoDocError::formula(format!(
                "expected {expected:?}, found {token:?}"
            ))),
            None => Err(ScoDocError::formula(format!(
                "expected {expected:?}, found end of expression"
            ))),
        }
    }

    fn expression(&mut self) -> Result<Expr> {
        let then = self.or_expr()?;
        if self.at_keyword("if") {
            self.pos += 1;
            let cond = self.or_expr()?;
            if !self.at_keyword("else") {
                return Err(ScoDocError::formula("expected 'else' in conditional expression"));
            }
            self.pos += 1;
            let otherwise = self.nested(Self::expression)?;
            return Ok(Expr::IfElse {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(then)
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.at_keyword("or") {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.not_expr()?;
        while self.at_keyword("and") {
            self.pos += 1;
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.at_keyword("not") {
            self.pos += 1;
            let operand = self.nested(Self::not_expr)?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let first = self.arith()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Op("<")) => CmpOp::Lt,
                Some(Token::Op("<=")) => CmpOp::Le,
                Some(Token::Op(">")) => CmpOp::Gt,
                Some(Token::Op(">=")) => CmpOp::Ge,
                Some(Token::Op("==")) => CmpOp::Eq,
                Some(Token::Op("!=")) => CmpOp::Ne,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn arith(&mut self) -> Result<Expr> {
        let mut left = self.term()?;
        loop {
            let op = if self.at_op("+") {
                BinaryOp::Add
            } else if self.at_op("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op("*")) => BinaryOp::Mul,
                Some(Token::Op("/")) => BinaryOp::Div,
                Some(Token::Op("//")) => BinaryOp::FloorDiv,
                Some(Token::Op("%")) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr> {
        if self.at_op("-") {
            self.pos += 1;
            let operand = self.nested(Self::factor)?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        if self.at_op("+") {
            self.pos += 1;
            return self.nested(Self::factor);
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.postfix()?;
        if self.at_op("**") {
            self.pos += 1;
            // 右结合，且指数可带一元负号
            let exponent = self.nested(Self::factor)?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    let Expr::Name(name) = expr else {
                        return Err(ScoDocError::formula("only named functions can be called"));
                    };
                    self.pos += 1;
                    let args = self.nested(|p| p.sequence(Token::RParen))?;
                    expr = Expr::Call(name, args);
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.nested(Self::expression)?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// 逗号分隔的表达式序列，直到 `close`（允许末尾逗号）
    fn sequence(&mut self, close: Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(&close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.expression()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(token) if token == close => return Ok(items),
                Some(token) => {
                    return Err(ScoDocError::formula(format!("unexpected token {token:?}")));
                }
                None => return Err(ScoDocError::formula("unexpected end of expression")),
            }
        }
    }

    fn atom(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(v)) => Ok(Expr::Number(v)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => match name.as_str() {
                "True" => Ok(Expr::Bool(true)),
                "False" => Ok(Expr::Bool(false)),
                kw if KEYWORDS.contains(&kw) => {
                    Err(ScoDocError::formula(format!("unexpected keyword '{kw}'")))
                }
                _ => Ok(Expr::Name(name)),
            },
            Some(Token::LParen) => {
                let expr = self.nested(Self::expression)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBracket) => Ok(Expr::List(
                self.nested(|p| p.sequence(Token::RBracket))?,
            )),
            Some(token) => Err(ScoDocError::formula(format!("unexpected token {token:?}"))),
            None => Err(ScoDocError::formula("unexpected end of expression")),
        }
    }
}

/// 拒绝未知变量，以及对非内置函数的调用
fn check_names(expr: &Expr) -> Result<()> {
    match expr {
        Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) => Ok(()),
        Expr::Name(name) => {
            if FORMULA_VARIABLES.contains(&name.as_str()) {
                Ok(())
            } else {
                Err(ScoDocError::formula(format!("unknown name '{name}'")))
            }
        }
        Expr::Call(name, args) => {
            if !FORMULA_BUILTINS.contains(&name.as_str()) {
                return Err(ScoDocError::formula(format!("unknown function '{name}'")));
            }
            args.iter().try_for_each(check_names)
        }
        Expr::List(items) => items.iter().try_for_each(check_names),
        Expr::Neg(inner) | Expr::Not(inner) => check_names(inner),
        Expr::Binary(_, l, r) | Expr::And(l, r) | Expr::Or(l, r) | Expr::Index(l, r) => {
            check_names(l)?;
            check_names(r)
        }
        Expr::Compare(first, rest) => {
            check_names(first)?;
            rest.iter().try_for_each(|(_, e)| check_names(e))
        }
        Expr::IfElse {
            cond,
            then,
            otherwise,
        } => {
            check_names(cond)?;
            check_names(then)?;
            check_names(otherwise)
        }
    }
}

// ---------------------------------------------------------------------------
// 求值

fn eval(expr: &Expr, env: &Bindings) -> Result<Value> {
    match expr {
        Expr::Number(v) => Ok(Value::Number(*v)),
        Expr::Str(s) => Ok(Value::Text(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Name(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| ScoDocError::formula(format!("unknown name '{name}'"))),
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| eval(item, env)?.as_number())
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Vector(values))
        }
        Expr::Neg(inner) => match eval(inner, env)? {
            Value::Vector(v) => Ok(Value::Vector(v.into_iter().map(|x| -x).collect())),
            other => Ok(Value::Number(-other.as_number()?)),
        },
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, env)?.truthy())),
        Expr::Binary(op, l, r) => arithmetic(*op, eval(l, env)?, eval(r, env)?),
        Expr::Compare(first, rest) => {
            let mut left = eval(first, env)?;
            for (op, right_expr) in rest {
                let right = eval(right_expr, env)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(l, r) => {
            let left = eval(l, env)?;
            if left.truthy() { eval(r, env) } else { Ok(left) }
        }
        Expr::Or(l, r) => {
            let left = eval(l, env)?;
            if left.truthy() { Ok(left) } else { eval(r, env) }
        }
        Expr::IfElse {
            cond,
            then,
            otherwise,
        } => {
            if eval(cond, env)?.truthy() {
                eval(then, env)
            } else {
                eval(otherwise, env)
            }
        }
        Expr::Index(target, index) => {
            let target = eval(target, env)?;
            let values = target.as_vector()?;
            let index = eval(index, env)?.as_number()?;
            if index.fract() != 0.0 {
                return Err(ScoDocError::formula("vector index must be an integer"));
            }
            let len = values.len() as i64;
            let mut i = index as i64;
            if i < 0 {
                i += len;
            }
            if i < 0 || i >= len {
                return Err(ScoDocError::formula(format!("index {index} out of range")));
            }
            Ok(Value::Number(values[i as usize]))
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, env))
                .collect::<Result<Vec<_>>>()?;
            call_builtin(name, args)
        }
    }
}

fn apply(op: BinaryOp, a: f64, b: f64) -> Result<f64> {
    let divisor_check = |b: f64| {
        if b == 0.0 {
            Err(ScoDocError::formula("division by zero"))
        } else {
            Ok(b)
        }
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / divisor_check(b)?,
        BinaryOp::FloorDiv => (a / divisor_check(b)?).floor(),
        BinaryOp::Mod => {
            let b = divisor_check(b)?;
            a - b * (a / b).floor()
        }
        BinaryOp::Pow => a.powf(b),
    };
    if result.is_nan() {
        return Err(ScoDocError::formula("math domain error"));
    }
    Ok(result)
}

/// 逐元素运算，标量自动扩展到向量长度
fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match (left, right) {
        (Value::Vector(a), Value::Vector(b)) => {
            if a.len() != b.len() {
                return Err(ScoDocError::formula("vectors sizes don't match"));
            }
            let values = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| apply(op, *x, *y))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Vector(values))
        }
        (Value::Vector(a), scalar) => {
            let s = scalar.as_number()?;
            let values = a
                .iter()
                .map(|x| apply(op, *x, s))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Vector(values))
        }
        (scalar, Value::Vector(b)) => {
            let s = scalar.as_number()?;
            let values = b
                .iter()
                .map(|y| apply(op, s, *y))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Vector(values))
        }
        (a, b) => Ok(Value::Number(apply(op, a.as_number()?, b.as_number()?)?)),
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool> {
    if let (Value::Text(_), _) | (_, Value::Text(_)) = (left, right) {
        return match op {
            CmpOp::Eq => Ok(left == right),
            CmpOp::Ne => Ok(left != right),
            _ => Err(ScoDocError::formula("strings can only be compared with == and !=")),
        };
    }
    let a = left.as_number()?;
    let b = right.as_number()?;
    Ok(match op {
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
    })
}

fn arity(name: &str, args: &[Value], allowed: std::ops::RangeInclusive<usize>) -> Result<()> {
    if allowed.contains(&args.len()) {
        Ok(())
    } else {
        Err(ScoDocError::formula(format!(
            "{name}() takes {} to {} arguments ({} given)",
            allowed.start(),
            allowed.end(),
            args.len()
        )))
    }
}

/// 最大/最小值：一个向量参数，或多个标量参数
fn extremum(name: &str, args: &[Value], pick: fn(f64, f64) -> f64) -> Result<Value> {
    let values: Vec<f64> = match args {
        [Value::Vector(v)] => v.clone(),
        [_] | [] => {
            return Err(ScoDocError::formula(format!(
                "{name}() expects a vector or several numbers"
            )));
        }
        many => many.iter().map(Value::as_number).collect::<Result<_>>()?,
    };
    values
        .into_iter()
        .reduce(pick)
        .map(Value::Number)
        .ok_or_else(|| ScoDocError::formula(format!("{name}() arg is an empty sequence")))
}

fn call_builtin(name: &str, args: Vec<Value>) -> Result<Value> {
    match name {
        "V" => match args.as_slice() {
            [Value::Vector(v)] => Ok(Value::Vector(v.clone())),
            _ => Ok(Value::Vector(
                args.iter().map(Value::as_number).collect::<Result<_>>()?,
            )),
        },
        "dot" => {
            arity(name, &args, 2..=2)?;
            let u = args[0].as_vector()?;
            let v = args[1].as_vector()?;
            Ok(Value::Number(u.iter().zip(v).map(|(x, y)| x * y).sum()))
        }
        "max" => extremum(name, &args, f64::max),
        "min" => extremum(name, &args, f64::min),
        "abs" => {
            arity(name, &args, 1..=1)?;
            Ok(Value::Number(args[0].as_number()?.abs()))
        }
        "cmp" => {
            arity(name, &args, 2..=2)?;
            let a = args[0].as_number()?;
            let b = args[1].as_number()?;
            let sign = (a > b) as i32 - (a < b) as i32;
            Ok(Value::Number(f64::from(sign)))
        }
        "len" => {
            arity(name, &args, 1..=1)?;
            match &args[0] {
                Value::Vector(v) => Ok(Value::Number(v.len() as f64)),
                Value::Text(s) => Ok(Value::Number(s.chars().count() as f64)),
                other => Err(ScoDocError::formula(format!(
                    "object of type {} has no len()",
                    other.type_name()
                ))),
            }
        }
        "pow" => {
            arity(name, &args, 2..=2)?;
            Ok(Value::Number(apply(
                BinaryOp::Pow,
                args[0].as_number()?,
                args[1].as_number()?,
            )?))
        }
        "round" => {
            arity(name, &args, 1..=2)?;
            let x = args[0].as_number()?;
            let digits = match args.get(1) {
                Some(d) => d.as_number()?,
                None => 0.0,
            };
            let scale = 10f64.powf(digits);
            Ok(Value::Number((x * scale).round_ties_even() / scale))
        }
        "sum" => {
            arity(name, &args, 1..=2)?;
            let start = match args.get(1) {
                Some(s) => s.as_number()?,
                None => 0.0,
            };
            Ok(Value::Number(start + args[0].as_vector()?.iter().sum::<f64>()))
        }
        "ifelse" => {
            arity(name, &args, 3..=3)?;
            let mut args = args;
            let otherwise = args.pop();
            let then = args.pop();
            match (args[0].truthy(), then, otherwise) {
                (true, Some(then), _) => Ok(then),
                (false, _, Some(otherwise)) => Ok(otherwise),
                _ => Err(ScoDocError::formula("ifelse() takes 3 arguments")),
            }
        }
        "geomean" => {
            arity(name, &args, 1..=2)?;
            let v = args[0].as_vector()?;
            if v.is_empty() {
                return Err(ScoDocError::formula("geomean() of an empty vector"));
            }
            let mean = match args.get(1) {
                None => v.iter().product::<f64>().powf(1.0 / v.len() as f64),
                Some(weights) => {
                    let w = weights.as_vector()?;
                    if w.len() != v.len() {
                        return Err(ScoDocError::formula("vectors sizes don't match"));
                    }
                    let total: f64 = w.iter().sum();
                    if total == 0.0 {
                        return Err(ScoDocError::formula("division by zero"));
                    }
                    v.iter()
                        .zip(w)
                        .map(|(x, y)| x.powf(*y))
                        .product::<f64>()
                        .powf(1.0 / total)
                }
            };
            if mean.is_nan() {
                return Err(ScoDocError::formula("math domain error"));
            }
            Ok(Value::Number(mean))
        }
        other => Err(ScoDocError::formula(format!("unknown function '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> FormulaInputs {
        FormulaInputs {
            notes: vec![12.0, 13.0, 0.0],
            coefs: vec![1.0, 2.0, 0.0],
            cmask: vec![1.0, 1.0, 0.0],
            moy: Average::Numeric(38.0 / 3.0),
            absences: AbsenceCounts {
                total: 4,
                justified: 1,
            },
        }
    }

    fn number(expr: &str) -> f64 {
        match evaluate(expr, &inputs().bindings()).unwrap() {
            Value::Number(v) => v,
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn test_inactive_expressions() {
        assert!(Formula::compile("").unwrap().is_none());
        assert!(Formula::compile("   ").unwrap().is_none());
        assert!(Formula::compile("# max(notes)").unwrap().is_none());
        assert!(!is_active("#"));
        assert!(is_active(" moy "));
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert_eq!(number("1 + 2 * 3"), 7.0);
        assert_eq!(number("(1 + 2) * 3"), 9.0);
        assert_eq!(number("2 ** 3 ** 2"), 512.0);
        assert_eq!(number("-2 ** 2"), -4.0);
        assert_eq!(number("7 // 2"), 3.0);
        assert_eq!(number("-7 % 3"), 2.0);
        assert_eq!(number("1.5e1"), 15.0);
    }

    #[test]
    fn test_weighted_mean_formula() {
        let v = number("dot(notes, coefs) / sum(coefs)");
        assert!((v - 38.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_vector_operations() {
        assert_eq!(number("sum(notes * cmask)"), 25.0);
        assert_eq!(number("max(notes)"), 13.0);
        assert_eq!(number("min(3, 1, 2)"), 1.0);
        assert_eq!(number("len(notes)"), 3.0);
        assert_eq!(number("notes[1]"), 13.0);
        assert_eq!(number("notes[-1]"), 0.0);
        assert_eq!(number("sum(V(1, 2, 3) + 1)"), 9.0);
        assert_eq!(number("sum([1, 2], 10)"), 13.0);
    }

    #[test]
    fn test_builtins() {
        assert_eq!(number("abs(-3)"), 3.0);
        assert_eq!(number("cmp(2, 5)"), -1.0);
        assert_eq!(number("pow(2, 10)"), 1024.0);
        assert_eq!(number("round(2.5)"), 2.0);
        assert_eq!(number("round(12.345, 1)"), 12.3);
        assert_eq!(number("ifelse(nb_abs > 3, 0, moy_val)"), 0.0);
        assert!((number("geomean(V(4, 16))") - 8.0).abs() < 1e-9);
        assert!((number("geomean(V(4, 16), V(1, 1))") - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_conditionals_and_booleans() {
        assert_eq!(number("10 if moy_is_valid else 0"), 10.0);
        assert_eq!(number("nb_abs_nojust"), 3.0);
        let env = inputs().bindings();
        assert_eq!(evaluate("1 < 2 < 3", &env).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("3 > 2 > 2", &env).unwrap(), Value::Bool(false));
        assert_eq!(evaluate("not moy_valid", &env).unwrap(), Value::Bool(false));
        assert_eq!(evaluate("0 or 5", &env).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_na_handling() {
        let mut inputs = inputs();
        inputs.moy = Average::NotAvailable;
        let formula = Formula::compile("\"NA\" if moy == \"NA\" else moy").unwrap().unwrap();
        assert_eq!(formula.average(&inputs).unwrap(), Average::NotAvailable);
        assert_eq!(
            inputs.bindings().get("moy_val"),
            Some(&Value::Number(0.0))
        );
    }

    #[test]
    fn test_unknown_names_rejected() {
        let err = Formula::validate("__import__('os')").unwrap_err();
        assert_eq!(err.code(), "E012");
        assert!(Formula::validate("open(notes)").is_err());
        assert!(Formula::validate("moy + secret").is_err());
        assert!(Formula::validate("notes.sum()").is_err());
        assert!(Formula::validate("max(notes) - nb_abs_just").is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(Formula::validate("1 +").is_err());
        assert!(Formula::validate("max(notes").is_err());
        assert!(Formula::validate("1 if moy").is_err());
        assert!(Formula::validate("'abc").is_err());
        assert!(Formula::validate("moy $ 2").is_err());
    }

    #[test]
    fn test_average_range_check() {
        let inputs = inputs();
        let out_of_range = Formula::compile("moy + 10").unwrap().unwrap();
        assert!(out_of_range.average(&inputs).is_err());

        let ok = Formula::compile("max(notes)").unwrap().unwrap();
        assert_eq!(ok.average(&inputs).unwrap(), Average::Numeric(13.0));

        let vector = Formula::compile("notes").unwrap().unwrap();
        assert!(vector.average(&inputs).is_err());
    }

    #[test]
    fn test_runtime_errors() {
        let env = inputs().bindings();
        assert!(evaluate("1 / 0", &env).is_err());
        assert!(evaluate("notes + V(1, 2)", &env).is_err());
        assert!(evaluate("notes[5]", &env).is_err());
        assert!(evaluate("max(V())", &env).is_err());
        assert!(evaluate("moy < \"NA\"", &env).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}moy{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(Formula::validate(&deep).is_err());

        let deep_parens = format!("{}moy{}", "(".repeat(200), ")".repeat(200));
        let err = Parser::new(tokenize(&deep_parens).unwrap()).parse().unwrap_err();
        assert_eq!(err.message(), "expression too deeply nested");

        let negations = format!("{}moy", "-".repeat(200));
        let err = Parser::new(tokenize(&negations).unwrap()).parse().unwrap_err();
        assert_eq!(err.message(), "expression too deeply nested");

        let nots = format!("{}moy_is_valid", "not ".repeat(200));
        assert!(Formula::validate(&nots).is_err());

        let lists = format!("{}1{}", "[".repeat(200), "]".repeat(200));
        assert!(Formula::validate(&lists).is_err());

        // 合理的嵌套仍然可用
        let shallow = format!("{}moy{}", "(".repeat(20), ")".repeat(20));
        assert!(Formula::validate(&shallow).is_ok());
        assert!(Formula::validate("2 ** -3 ** 2").is_ok());
    }

    #[test]
    fn test_length_limit() {
        let long = format!("moy{}", " + 0".repeat(MAX_FORMULA_LENGTH));
        let err = Formula::validate(&long).unwrap_err();
        assert_eq!(err.code(), "E012");
        assert!(Formula::validate(&format!("moy{}", " + 0".repeat(100))).is_ok());
    }

    #[test]
    fn test_uses_absences() {
        assert!(uses_absences("moy - nb_abs / 10"));
        assert!(uses_absences("ifelse(nb_abs_nojust > 5, 0, moy)"));
        assert!(!uses_absences("abs(moy - 10)"));
        assert!(!uses_absences("# nb_abs"));
    }
}

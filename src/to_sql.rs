use crate::rex::{BinaryOp, ExprRef, Expression, FieldType, UnaryOp};
use std::cell::RefCell;
use std::fmt::{Display, Formatter, Result};
use std::rc::Rc;

/// Renders an expression to the SQL text of some dialect. Operator rules match
///  their patterns against this text.
pub trait SqlRenderer<E> {
    fn render_sql(&self, expr: &E) -> String;
}

pub trait PrinterContext: std::fmt::Debug {
    fn write_identifier(&self, out: &mut Formatter<'_>, name: &str) -> std::fmt::Result;
    fn box_clone(&self) -> Box<dyn PrinterContext>;

    fn write_type(&self, out: &mut Formatter<'_>, ty: FieldType) -> std::fmt::Result {
        write!(out, "{ty}")
    }
}

impl Clone for Box<dyn PrinterContext> {
    fn clone(&self) -> Box<dyn PrinterContext> {
        self.box_clone()
    }
}

/// Bare identifiers, as Hive and Presto print simple column names.
#[derive(Debug, Clone, Copy)]
pub struct PlainPrinterContext;

impl PrinterContext for PlainPrinterContext {
    fn write_identifier(&self, out: &mut Formatter<'_>, name: &str) -> std::fmt::Result {
        out.write_str(name)
    }
    fn box_clone(&self) -> Box<dyn PrinterContext> {
        Box::new(*self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PostgresPrinterContext;

impl PrinterContext for PostgresPrinterContext {
    fn write_identifier(&self, out: &mut Formatter<'_>, name: &str) -> std::fmt::Result {
        write!(out, "\"{}\"", name.replace('"', "\"\""))
    }
    fn write_type(&self, out: &mut Formatter<'_>, ty: FieldType) -> std::fmt::Result {
        match ty {
            FieldType::Double => write!(out, "DOUBLE PRECISION"),
            FieldType::Decimal => write!(out, "NUMERIC"),
            FieldType::Binary => write!(out, "BYTEA"),
            ty => write!(out, "{ty}"),
        }
    }
    fn box_clone(&self) -> Box<dyn PrinterContext> {
        Box::new(*self)
    }
}

#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub context: Box<dyn PrinterContext>,
}

impl PrinterConfig {
    pub fn postgres() -> Self {
        Self {
            context: Box::new(PostgresPrinterContext),
        }
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            context: Box::new(PlainPrinterContext),
        }
    }
}

impl SqlRenderer<ExprRef> for PrinterConfig {
    fn render_sql(&self, expr: &ExprRef) -> String {
        Printer::new(expr, self.clone()).to_string()
    }
}

pub struct Printer<T> {
    tree: T,
    config: PrinterConfig,
}

impl<T> Printer<T> {
    pub fn new(tree: T, config: PrinterConfig) -> Self {
        Self { tree, config }
    }
}

pub trait ToSQL {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result;
}

impl<T> ToSQL for &T
where
    T: ToSQL + ?Sized,
{
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        (**self).to_sql(out, conf)
    }
}

impl<T> ToSQL for Rc<RefCell<T>>
where
    T: ToSQL,
{
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        self.borrow().to_sql(out, conf)
    }
}

impl<T> Display for Printer<T>
where
    T: ToSQL,
{
    fn fmt(&self, f: &mut Formatter) -> Result {
        self.tree.to_sql(f, &self.config)
    }
}

impl ToSQL for BinaryOp {
    fn to_sql(&self, out: &mut Formatter, _: &PrinterConfig) -> Result {
        match self {
            BinaryOp::Add => write!(out, " + "),
            BinaryOp::Sub => write!(out, " - "),
            BinaryOp::Mul => write!(out, " * "),
            BinaryOp::Div => write!(out, " / "),

            BinaryOp::Eq => write!(out, " = "),
            BinaryOp::Ne => write!(out, " <> "),
            BinaryOp::Lt => write!(out, " < "),
            BinaryOp::Le => write!(out, " <= "),
            BinaryOp::Gt => write!(out, " > "),
            BinaryOp::Ge => write!(out, " >= "),
            BinaryOp::And => write!(out, " AND "),
            BinaryOp::Or => write!(out, " OR "),
            BinaryOp::Concat => write!(out, " || "),
        }
    }
}

const NOT_PRECEDENCE: u8 = 3;
const NEG_PRECEDENCE: u8 = 8;

/// How tightly `expr` binds when printed. Anything that is not an infix or
///  prefix operator never needs parentheses.
fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::BinaryOperator(_, op, _) => op.precedence(),
        Expression::UnaryOperator(UnaryOp::Not, _) => NOT_PRECEDENCE,
        Expression::UnaryOperator(UnaryOp::Neg, _) => NEG_PRECEDENCE,
        // a leading sign behaves like negation, and `--` would open a comment
        Expression::NumberLiteral { text, .. } if text.starts_with('-') => NEG_PRECEDENCE,
        _ => u8::MAX,
    }
}

fn is_comparison(expr: &Expression) -> bool {
    matches!(expr, Expression::BinaryOperator(_, op, _) if op.is_comparison())
}

fn write_operand(
    out: &mut Formatter,
    conf: &PrinterConfig,
    operand: &ExprRef,
    parenthesize: bool,
) -> Result {
    if parenthesize {
        write!(out, "(")?;
        operand.to_sql(out, conf)?;
        write!(out, ")")
    } else {
        operand.to_sql(out, conf)
    }
}

impl ToSQL for Expression {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        match self {
            Expression::BoolLiteral(v) => {
                write!(out, "{}", if *v { "TRUE" } else { "FALSE" })
            }
            Expression::NumberLiteral { text, .. } => write!(out, "{text}"),
            Expression::SingleQuoteStringLiteral(v) => write!(out, "'{}'", v.replace('\'', "''")),
            Expression::InputRef { name, .. } => conf.context.write_identifier(out, name),
            Expression::UnaryOperator(op, exp) => {
                let inner = precedence(&exp.borrow());
                match op {
                    UnaryOp::Not => {
                        write!(out, "NOT ")?;
                        write_operand(out, conf, exp, inner < NOT_PRECEDENCE)
                    }
                    UnaryOp::Neg => {
                        write!(out, "-")?;
                        write_operand(out, conf, exp, inner != u8::MAX)
                    }
                }
            }
            Expression::BinaryOperator(l, op, r) => {
                // left-associative: an equal-precedence right child keeps its parens
                let p = op.precedence();
                let lp = precedence(&l.borrow());
                let rp = precedence(&r.borrow());
                let nested_comparison =
                    |e: &ExprRef| op.is_comparison() && is_comparison(&e.borrow());
                write_operand(out, conf, l, lp < p || nested_comparison(l))?;
                op.to_sql(out, conf)?;
                write_operand(out, conf, r, rp <= p)
            }
            Expression::FunctionCall { name, args, .. } => {
                write!(out, "{name}(")?;
                let mut is_first = true;
                for arg in args.iter() {
                    if is_first {
                        is_first = false;
                    } else {
                        write!(out, ", ")?;
                    }
                    arg.to_sql(out, conf)?;
                }
                write!(out, ")")
            }
            Expression::Cast(expr, to) => {
                write!(out, "CAST(")?;
                expr.to_sql(out, conf)?;
                write!(out, " AS ")?;
                conf.context.write_type(out, *to)?;
                write!(out, ")")
            }
        }
    }
}

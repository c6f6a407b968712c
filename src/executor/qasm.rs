//! OpenQASM 3 subset parser.
//!
//! Accepts the statements a typical measurement circuit needs: the version
//! header, `include` (ignored), register declarations in both the 3.x
//! (`qubit[2] q;`) and 2.x (`qreg q[2];`) spellings, the fixed gate set
//! `id h x y z s sdg t tdg cx cz swap`, `barrier` (ignored) and `measure` in
//! both assignment and arrow forms. Everything else is rejected with
//! [`ExecutorError::Parse`].

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExecutorError;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\n]*").expect("valid regex"));

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^OPENQASM\s+(\d+)(?:\.\d+)?$").expect("valid regex"));

static INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^include\s+"[^"]*"$"#).expect("valid regex"));

static DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(qubit|bit)\s*(?:\[\s*(\d+)\s*\])?\s+([A-Za-z_][A-Za-z0-9_]*)$")
        .expect("valid regex")
});

static LEGACY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(qreg|creg)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\[\s*(\d+)\s*\]$")
        .expect("valid regex")
});

static MEASURE_ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^measure\s+(.+?)\s*->\s*(.+)$").expect("valid regex"));

static MEASURE_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*=\s*measure\s+(.+)$").expect("valid regex"));

static GATE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*(\([^)]*\))?\s*(.*)$").expect("valid regex")
});

static OPERAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[\s*(\d+)\s*\])?$").expect("valid regex")
});

/// Supported gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Id,
    H,
    X,
    Y,
    Z,
    S,
    Sdg,
    T,
    Tdg,
    Cx,
    Cz,
    Swap,
}

impl Gate {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "id" => Self::Id,
            "h" => Self::H,
            "x" => Self::X,
            "y" => Self::Y,
            "z" => Self::Z,
            "s" => Self::S,
            "sdg" => Self::Sdg,
            "t" => Self::T,
            "tdg" => Self::Tdg,
            "cx" | "CX" => Self::Cx,
            "cz" => Self::Cz,
            "swap" => Self::Swap,
            _ => return None,
        })
    }

    /// Number of qubit operands the gate takes.
    pub fn arity(&self) -> usize {
        match self {
            Self::Cx | Self::Cz | Self::Swap => 2,
            _ => 1,
        }
    }
}

/// One operation on flattened qubit / classical bit indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Gate { gate: Gate, qubits: Vec<usize> },
    Measure { qubit: usize, bit: usize },
}

/// A named register occupying `offset..offset + size` of its index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

/// Parsed circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Circuit {
    qregs: Vec<Register>,
    cregs: Vec<Register>,
    ops: Vec<Op>,
}

impl Circuit {
    pub fn num_qubits(&self) -> usize {
        self.qregs.iter().map(|r| r.size).sum()
    }

    pub fn num_clbits(&self) -> usize {
        self.cregs.iter().map(|r| r.size).sum()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn cregs(&self) -> &[Register] {
        &self.cregs
    }

    pub fn has_measurements(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, Op::Measure { .. }))
    }

    /// Render classical bits as a counts key.
    ///
    /// Within a register bit 0 is rightmost; registers are separated by a
    /// space with the first-declared register rightmost.
    pub fn format_bits(&self, bits: &[bool]) -> String {
        self.cregs
            .iter()
            .rev()
            .map(|reg| {
                (0..reg.size)
                    .rev()
                    .map(|i| {
                        if bits.get(reg.offset + i).copied().unwrap_or(false) {
                            '1'
                        } else {
                            '0'
                        }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy)]
enum RegisterKind {
    Quantum(usize),
    Classical(usize),
}

#[derive(Default)]
struct Parser {
    circuit: Circuit,
    names: HashMap<String, RegisterKind>,
    measured: HashSet<usize>,
}

/// Parse QASM source into a [`Circuit`].
pub fn parse(source: &str) -> Result<Circuit, ExecutorError> {
    let stripped = BLOCK_COMMENT.replace_all(source, " ");
    let stripped = LINE_COMMENT.replace_all(&stripped, "");

    let statements: Vec<&str> = stripped
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if statements.is_empty() {
        return Err(ExecutorError::Parse("empty program".into()));
    }

    let mut parser = Parser::default();
    for (i, statement) in statements.iter().enumerate() {
        parser.statement(statement, i == 0)?;
    }
    Ok(parser.circuit)
}

fn err(message: impl Into<String>) -> ExecutorError {
    ExecutorError::Parse(message.into())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Parser {
    fn statement(&mut self, raw: &str, first: bool) -> Result<(), ExecutorError> {
        let stmt = collapse_whitespace(raw);

        if let Some(caps) = HEADER.captures(&stmt) {
            if !first {
                return Err(err("OPENQASM header must be the first statement"));
            }
            return match &caps[1] {
                "3" => Ok(()),
                other => Err(err(format!("unsupported OpenQASM version {other}"))),
            };
        }
        if stmt.starts_with("OPENQASM") {
            return Err(err(format!("malformed header '{stmt}'")));
        }
        if INCLUDE.is_match(&stmt) {
            return Ok(());
        }
        if stmt == "barrier" || stmt.starts_with("barrier ") {
            return Ok(());
        }

        if let Some(caps) = DECL.captures(&stmt) {
            let size = match caps.get(2) {
                Some(m) => parse_size(m.as_str())?,
                None => 1,
            };
            return self.declare(&caps[3], size, &caps[1] == "qubit");
        }
        if let Some(caps) = LEGACY_DECL.captures(&stmt) {
            let size = parse_size(&caps[3])?;
            return self.declare(&caps[2], size, &caps[1] == "qreg");
        }

        if let Some(caps) = MEASURE_ARROW.captures(&stmt) {
            return self.measure(&caps[1], &caps[2]);
        }
        if let Some(caps) = MEASURE_ASSIGN.captures(&stmt) {
            return self.measure(&caps[2], &caps[1]);
        }

        if let Some(caps) = GATE_CALL.captures(&stmt) {
            let name = &caps[1];
            if caps.get(2).is_some() {
                return Err(err(format!("parameterized gate '{name}' is not supported")));
            }
            if let Some(gate) = Gate::from_name(name) {
                return self.gate(gate, caps.get(3).map_or("", |m| m.as_str()));
            }
            if matches!(name, "reset" | "gate" | "if" | "for" | "while" | "def" | "let") {
                return Err(err(format!("unsupported statement '{stmt}'")));
            }
            return Err(err(format!("unknown gate '{name}'")));
        }

        Err(err(format!("unsupported statement '{stmt}'")))
    }

    fn declare(&mut self, name: &str, size: usize, quantum: bool) -> Result<(), ExecutorError> {
        if self.names.contains_key(name) {
            return Err(err(format!("register '{name}' is already declared")));
        }
        if size == 0 {
            return Err(err(format!("register '{name}' must have at least one bit")));
        }

        let regs = if quantum {
            &mut self.circuit.qregs
        } else {
            &mut self.circuit.cregs
        };
        let offset = regs.iter().map(|r| r.size).sum();
        regs.push(Register {
            name: name.to_string(),
            offset,
            size,
        });
        let index = regs.len() - 1;
        let kind = if quantum {
            RegisterKind::Quantum(index)
        } else {
            RegisterKind::Classical(index)
        };
        self.names.insert(name.to_string(), kind);
        Ok(())
    }

    fn gate(&mut self, gate: Gate, operands: &str) -> Result<(), ExecutorError> {
        let resolved = operands
            .split(',')
            .map(|op| self.qubits(op.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        if resolved.len() != gate.arity() {
            return Err(err(format!(
                "gate {gate:?} takes {} operand(s), got {}",
                gate.arity(),
                resolved.len()
            )));
        }

        for qubits in broadcast(&resolved)? {
            if let Some(q) = qubits.iter().find(|q| self.measured.contains(*q)) {
                return Err(err(format!(
                    "gate applied to qubit {q} after measurement is not supported"
                )));
            }
            let mut seen = HashSet::new();
            if !qubits.iter().all(|q| seen.insert(*q)) {
                return Err(err(format!("gate {gate:?} repeats a qubit operand")));
            }
            self.circuit.ops.push(Op::Gate { gate, qubits });
        }
        Ok(())
    }

    fn measure(&mut self, source: &str, target: &str) -> Result<(), ExecutorError> {
        let qubits = self.qubits(source.trim())?;
        let bits = self.clbits(target.trim())?;
        if qubits.len() != bits.len() {
            return Err(err(format!(
                "measure size mismatch: {} qubit(s) into {} bit(s)",
                qubits.len(),
                bits.len()
            )));
        }
        for (qubit, bit) in qubits.into_iter().zip(bits) {
            self.measured.insert(qubit);
            self.circuit.ops.push(Op::Measure { qubit, bit });
        }
        Ok(())
    }

    fn qubits(&self, operand: &str) -> Result<Vec<usize>, ExecutorError> {
        let (name, index) = split_operand(operand)?;
        match self.names.get(name) {
            Some(RegisterKind::Quantum(i)) => select(&self.circuit.qregs[*i], index),
            Some(RegisterKind::Classical(_)) => {
                Err(err(format!("'{name}' is a classical register, expected qubits")))
            }
            None => Err(err(format!("undeclared register '{name}'"))),
        }
    }

    fn clbits(&self, operand: &str) -> Result<Vec<usize>, ExecutorError> {
        let (name, index) = split_operand(operand)?;
        match self.names.get(name) {
            Some(RegisterKind::Classical(i)) => select(&self.circuit.cregs[*i], index),
            Some(RegisterKind::Quantum(_)) => {
                Err(err(format!("'{name}' is a qubit register, expected bits")))
            }
            None => Err(err(format!("undeclared register '{name}'"))),
        }
    }
}

fn parse_size(raw: &str) -> Result<usize, ExecutorError> {
    raw.parse()
        .map_err(|_| err(format!("invalid register size '{raw}'")))
}

fn split_operand(operand: &str) -> Result<(&str, Option<usize>), ExecutorError> {
    let caps = OPERAND
        .captures(operand)
        .ok_or_else(|| err(format!("invalid operand '{operand}'")))?;
    let name = caps.get(1).map_or("", |m| m.as_str());
    let index = match caps.get(2) {
        Some(m) => Some(
            m.as_str()
                .parse()
                .map_err(|_| err(format!("invalid index in '{operand}'")))?,
        ),
        None => None,
    };
    Ok((name, index))
}

fn select(reg: &Register, index: Option<usize>) -> Result<Vec<usize>, ExecutorError> {
    match index {
        Some(i) if i < reg.size => Ok(vec![reg.offset + i]),
        Some(i) => Err(err(format!(
            "index {i} out of range for register '{}' of size {}",
            reg.name, reg.size
        ))),
        None => Ok((reg.offset..reg.offset + reg.size).collect()),
    }
}

/// Expand register operands into per-qubit applications. Every operand is
/// either a single qubit or a register of one common size.
fn broadcast(operands: &[Vec<usize>]) -> Result<Vec<Vec<usize>>, ExecutorError> {
    let width = operands.iter().map(Vec::len).max().unwrap_or(1);
    if operands.iter().any(|o| o.len() != 1 && o.len() != width) {
        return Err(err("register operands must have equal sizes"));
    }
    Ok((0..width)
        .map(|i| {
            operands
                .iter()
                .map(|o| if o.len() == 1 { o[0] } else { o[i] })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BELL: &str = r#"
        OPENQASM 3.0;
        include "stdgates.inc";
        qubit[2] q;
        bit[2] c;
        h q[0];
        cx q[0], q[1];
        c[0] = measure q[0];
        c[1] = measure q[1];
    "#;

    fn parse_err(source: &str) -> String {
        match parse(source) {
            Err(ExecutorError::Parse(msg)) => msg,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn parses_bell_circuit() {
        let circuit = parse(BELL).unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(
            circuit.ops(),
            &[
                Op::Gate {
                    gate: Gate::H,
                    qubits: vec![0]
                },
                Op::Gate {
                    gate: Gate::Cx,
                    qubits: vec![0, 1]
                },
                Op::Measure { qubit: 0, bit: 0 },
                Op::Measure { qubit: 1, bit: 1 },
            ]
        );
    }

    #[test]
    fn parses_legacy_syntax_and_comments() {
        let source = r#"
            OPENQASM 3;
            // two registers, old style
            qreg q[2];
            creg c[2];
            /* flip
               both */
            x q;
            barrier q;
            measure q -> c;
        "#;
        let circuit = parse(source).unwrap();
        assert_eq!(circuit.ops().len(), 4);
        assert!(circuit.has_measurements());
    }

    #[test]
    fn broadcasts_two_qubit_gates_over_registers() {
        let source = "qubit[2] a; qubit[2] b; cx a, b;";
        let circuit = parse(source).unwrap();
        assert_eq!(
            circuit.ops(),
            &[
                Op::Gate {
                    gate: Gate::Cx,
                    qubits: vec![0, 2]
                },
                Op::Gate {
                    gate: Gate::Cx,
                    qubits: vec![1, 3]
                },
            ]
        );
    }

    #[test]
    fn header_is_optional() {
        let circuit = parse("qubit q; bit c; x q; c = measure q;").unwrap();
        assert_eq!(circuit.num_qubits(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_err("this is not qasm").contains("unknown gate 'this'"));
        assert_eq!(parse_err("   // nothing\n"), "empty program");
        assert!(parse_err("OPENQASM 2.0; qreg q[1];").contains("unsupported OpenQASM version"));
    }

    #[test]
    fn rejects_unknown_registers_and_indices() {
        assert!(parse_err("qubit[1] q; h r[0];").contains("undeclared register 'r'"));
        assert!(parse_err("qubit[1] q; h q[3];").contains("out of range"));
        assert!(parse_err("qubit[1] q; bit[2] c; measure q -> c;").contains("size mismatch"));
        assert!(parse_err("qubit[1] q; qubit[1] q;").contains("already declared"));
    }

    #[test]
    fn rejects_unsupported_constructs() {
        assert!(parse_err("qubit q; rz(0.5) q;").contains("parameterized gate"));
        assert!(parse_err("qubit q; reset q;").contains("unsupported statement"));
        assert!(parse_err("qubit[2] q; cx q[0], q[0];").contains("repeats"));
        assert!(parse_err("qubit q; bit c; c = measure q; x q;").contains("after measurement"));
        assert!(parse_err("qubit q; qubit r; OPENQASM 3;").contains("first statement"));
    }

    #[test]
    fn formats_bits_little_endian_per_register() {
        let circuit = parse("qubit[3] q; bit[2] a; bit[1] b; measure q[0] -> a[0];").unwrap();
        // a = [1, 0], b = [1]
        assert_eq!(circuit.format_bits(&[true, false, true]), "1 01");
    }
}

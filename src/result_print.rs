//! Print verification verdicts and traces, colored when on a terminal.

use crate::expr::{display_expr, ExprArena};
use crate::fsm::MachineReport;
use crate::mc::ComputeResult;
use crate::properties::{PropStatus, Property};
use crate::trace::Trace;

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// How much output verification produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrintOptions {
    NoPrint,
    ShortPrint,
    FullPrint,
}

fn write_colored(stdout: &mut StandardStream, text: &str, color: Color) {
    stdout
        .set_color(ColorSpec::new().set_fg(Some(color)))
        .unwrap();
    write!(stdout, "{text}").unwrap();
    stdout.reset().unwrap();
}

/// Print the verdict line of a property (and its trace with full output).
pub fn print_property_result(
    arena: &ExprArena,
    prop: &Property,
    trace: Option<&Trace>,
    options: PrintOptions,
) {
    if options == PrintOptions::NoPrint {
        return;
    }
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let formula = display_expr(arena, prop.expr);
    match &prop.status {
        PropStatus::True => {
            write!(&mut stdout, "-- specification {formula} is ").unwrap();
            write_colored(&mut stdout, "true", Color::Green);
            writeln!(&mut stdout).unwrap();
        }
        PropStatus::False => {
            write!(&mut stdout, "-- specification {formula} is ").unwrap();
            write_colored(&mut stdout, "false", Color::Red);
            writeln!(&mut stdout).unwrap();
        }
        PropStatus::Number(ComputeResult::Finite(value)) => {
            writeln!(&mut stdout, "-- {formula} is {value}").unwrap();
        }
        PropStatus::Number(ComputeResult::Infinity) => {
            writeln!(&mut stdout, "-- {formula} is infinity").unwrap();
        }
        PropStatus::Unchecked => {
            writeln!(&mut stdout, "-- specification {formula} is undecided").unwrap();
        }
        status => {
            writeln!(&mut stdout, "-- specification {formula} is [{status}]").unwrap();
        }
    }

    if let Some(trace) = trace {
        if options == PrintOptions::FullPrint {
            writeln!(&mut stdout, "-- as demonstrated by the following execution").unwrap();
            writeln!(&mut stdout, "Trace Type: Counterexample").unwrap();
            for line in trace.lines() {
                writeln!(&mut stdout, "{line}").unwrap();
            }
        }
    }
}

/// Print the machine well-formedness report.
pub fn print_machine_report(report: &MachineReport) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for line in report.lines() {
        writeln!(&mut stdout, "{line}").unwrap();
    }
}

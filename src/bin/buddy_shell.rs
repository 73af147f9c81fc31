//! Interactive front end for the buddy system simulator.

use std::io::{self, BufRead, Write};

use buddy_sim::{parse_capacity, Shell, ShellOutput};

fn prompt(out: &mut impl Write, text: &str) -> io::Result<()> {
    write!(out, "{}", text)?;
    out.flush()
}

fn main() -> io::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut out = io::stdout();

    writeln!(out, "--- Buddy System Memory Simulator ---")?;
    prompt(&mut out, "Total memory units (a power of two is recommended): ")?;

    let capacity = match lines.next().transpose()? {
        Some(line) => match parse_capacity(&line) {
            Ok(capacity) => capacity,
            Err(err) => {
                writeln!(out, "error: {}", err)?;
                return Ok(());
            }
        },
        None => return Ok(()),
    };

    let mut shell = match Shell::new(capacity) {
        Ok(shell) => shell,
        Err(err) => {
            writeln!(out, "error: {}", err)?;
            return Ok(());
        }
    };
    writeln!(
        out,
        "Buddy system initialized with {} memory units.",
        shell.allocator().total_size()
    )?;

    loop {
        prompt(
            &mut out,
            "\nAction (RESERVAR <size> <name> | LIBERAR <name> | MOSTRAR | SALIR): ",
        )?;
        let line = match lines.next().transpose()? {
            Some(line) => line,
            None => break,
        };

        match shell.execute(&line) {
            Ok(ShellOutput::Nothing) => {}
            Ok(ShellOutput::Print(text)) => writeln!(out, "{}", text)?,
            Ok(ShellOutput::Exit(text)) => {
                writeln!(out, "{}", text)?;
                break;
            }
            Err(err) => writeln!(out, "error: {}", err)?,
        }
    }
    Ok(())
}

use std::io::{self, BufRead, Write};

use kt_cli::{Observer, TransferEvent};

/// Prints transfer progress on stderr and asks questions on the terminal.
pub struct ConsoleObserver {
    interactive: bool,
}

impl ConsoleObserver {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl Observer for ConsoleObserver {
    fn on_event(&self, event: &TransferEvent<'_>) {
        eprintln!("{event}");
    }

    fn confirm(&self, prompt: &str) -> bool {
        // Without a terminal the default answer is yes.
        if !self.interactive {
            return true;
        }

        eprint!("{prompt}");
        let _ = io::stderr().flush();
        ask(&mut io::stdin().lock())
    }
}

/// Read one answer. Empty input, end of input and read errors take the default (yes).
fn ask(input: &mut impl BufRead) -> bool {
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => {
            let answer = answer.trim().to_ascii_lowercase();
            answer.is_empty() || answer == "y" || answer == "yes"
        }
        Err(_) => true,
    }
}

use std::process::ExitCode;

use episim::prelude::*;
use episim::run_with_args;

fn main() -> ExitCode {
    match run_with_args(|_, _| Ok(())) {
        Ok(context) => {
            let days = context.get_iteration() + 1;
            let infected = context
                .get_infection_report()
                .map_or(0, |report| report.total_infected);
            println!("{days} days simulated, {infected} persons infected");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("episim: {error}");
            ExitCode::FAILURE
        }
    }
}

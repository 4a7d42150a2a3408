use std::env;
use std::process;
use std::time::SystemTime;

use domain::adapters::memory_repo::InMemoryRepo;
use domain::service::{EventService, SubmitError};
use domain::slug::create_slug;
use domain::validate::EventForm;
use domain::Clock;

struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain slug <name>\n  domain check <name> [<description>]\n\nNotes:\n  - `check` runs the event workflow against an in-memory repository; nothing is persisted.",
        domain::about()
    );
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    match cmd.as_str() {
        "slug" => {
            let Some(name) = args.next() else {
                return Err("missing <name> for slug".into());
            };
            println!("{}", create_slug(&name));
            Ok(())
        }
        "check" => {
            let Some(name) = args.next() else {
                return Err("missing <name> for check".into());
            };
            let form = EventForm {
                name,
                description: args.next().unwrap_or_default(),
            };
            let svc = EventService::new(InMemoryRepo::new(), StdClock);
            match svc.create(&form) {
                Ok(event) => {
                    println!("ok: /{} -> {:?}", event.slug, event.name);
                    Ok(())
                }
                Err(SubmitError::Invalid(errors)) => {
                    for e in errors {
                        println!("{}: {}", e.field, e.message);
                    }
                    Err("validation failed".into())
                }
                Err(e) => Err(format!("create failed: {}", e)),
            }
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}

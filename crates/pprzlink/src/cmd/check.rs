use pprzlink_schema::{load_path, LoadError, SchemaConfig, SchemaModel};
use serde::Serialize;

use crate::cmd::CheckArgs;
use crate::exit::{load_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct ClassSummary<'a> {
    name: &'a str,
    id: Option<u8>,
    messages: usize,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    valid: bool,
    classes: Vec<ClassSummary<'a>>,
    messages: usize,
}

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let path = &args.schema.schema;
    let schema = match load_path(path, &SchemaConfig::default()) {
        Ok(schema) => schema,
        Err(LoadError::Compile(errors)) => {
            for error in errors.errors() {
                eprintln!("{}: {error}", path.display());
            }
            return Err(CliError::new(
                DATA_INVALID,
                format!("{}: {} schema error(s)", path.display(), errors.len()),
            ));
        }
        Err(err) => return Err(load_error("schema load failed", err)),
    };

    print_summary(&summarize(&schema), format);
    Ok(SUCCESS)
}

fn summarize(schema: &SchemaModel) -> CheckOutput<'_> {
    CheckOutput {
        valid: true,
        classes: schema
            .classes()
            .iter()
            .map(|class| ClassSummary {
                name: &class.name,
                id: class.id,
                messages: class.messages().len(),
            })
            .collect(),
        messages: schema.message_count(),
    }
}

fn print_summary(out: &CheckOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            vec!["CLASS", "ID", "MESSAGES"],
            out.classes
                .iter()
                .map(|class| {
                    vec![
                        class.name.to_string(),
                        class.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                        class.messages.to_string(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            println!("Schema OK: {} messages", out.messages);
            for class in &out.classes {
                match class.id {
                    Some(id) => println!("  {:<16} id={:<3} {} messages", class.name, id, class.messages),
                    None => println!("  {:<16} id=-   {} messages", class.name, class.messages),
                }
            }
        }
        OutputFormat::Raw => println!("{}", out.messages),
    }
}

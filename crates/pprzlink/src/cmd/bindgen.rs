use pprzlink_bindgen::{
    generate, generate_class, Backend, CBackend, Emitter, JsonEmitter, ListingEmitter, RustBackend,
};
use tracing::info;

use crate::cmd::{BackendArg, BindgenArgs, EmitArg};
use crate::exit::{bindgen_error, io_error, CliResult, SUCCESS};
use crate::output::print_raw;

pub fn run(args: BindgenArgs) -> CliResult<i32> {
    let schema = args.schema.load()?;
    let version = args.protocol.protocol;

    let backend: &dyn Backend = match args.backend {
        BackendArg::C => &CBackend,
        BackendArg::Rust => &RustBackend,
    };
    let bindings = match &args.class {
        Some(class) => generate_class(&schema, class, version, backend),
        None => generate(&schema, version, backend),
    }
    .map_err(|err| bindgen_error("bindgen failed", err))?;

    let emitter: &dyn Emitter = match args.emit {
        EmitArg::Json => &JsonEmitter,
        EmitArg::Listing => &ListingEmitter,
    };
    let text = emitter
        .emit(&bindings)
        .map_err(|err| bindgen_error("emit failed", err))?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &text)
                .map_err(|err| io_error(&format!("write {}", path.display()), err))?;
            info!(
                path = %path.display(),
                messages = bindings.messages.len(),
                "wrote bindings"
            );
        }
        None => print_raw(text.as_bytes()),
    }
    Ok(SUCCESS)
}

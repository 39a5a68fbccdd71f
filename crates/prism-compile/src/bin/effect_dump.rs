//! Dumps the contents of a compiled effect binary.
//!
//! A debugging aid for the serialized layout: prints the technique/pass
//! tree, constant buffers, and the effect-wide parameter table, with
//! per-shader bindings behind `--verbose`.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use prism_effect::read::read_effect;
use prism_effect::{Parameter, ParameterClass, Shader, ShaderStage};

#[derive(Debug, Parser)]
#[command(about = "Dump techniques, buffers, and parameters of a compiled effect")]
struct Args {
    /// Compiled effect file.
    input: PathBuf,

    /// Also dump per-shader attributes, samplers, and resources.
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let bytes = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let (effect, profile_tag) = read_effect(&bytes)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("failed to parse {}", args.input.display()))?;

    println!(
        "effect: profile tag {profile_tag}, {} technique(s), {} shader(s), {} buffer(s), {} parameter(s)",
        effect.techniques.len(),
        effect.shaders.len(),
        effect.constant_buffers.len(),
        effect.parameters.len(),
    );

    for technique in &effect.techniques {
        println!("technique {:?}", technique.name);
        for pass in &technique.passes {
            println!("  pass {:?}", pass.name);
            for state in &pass.states {
                let stage = ShaderStage::from_state_operation(state.operation)
                    .map(ShaderStage::name)
                    .unwrap_or("unknown");
                println!("    {stage} shader -> #{}", state.shader);
            }
        }
    }

    for (index, buffer) in effect.constant_buffers.iter().enumerate() {
        println!("cbuffer #{index} {:?}: {} bytes", buffer.name, buffer.size);
        for (parameter_index, offset) in buffer
            .parameter_index
            .iter()
            .zip(buffer.parameter_offsets())
        {
            let name = effect
                .parameters
                .get(*parameter_index)
                .map(|p| p.name.as_str())
                .unwrap_or("?");
            println!("  +{offset:<5} param #{parameter_index} {name}");
        }
    }

    println!("parameters:");
    for (index, parameter) in effect.parameters.iter().enumerate() {
        print_parameter(index, parameter);
    }

    if args.verbose {
        for shader in &effect.shaders {
            print_shader(shader);
        }
    }

    Ok(())
}

fn print_parameter(index: usize, parameter: &Parameter) {
    let shape = match parameter.class {
        ParameterClass::Scalar => String::new(),
        ParameterClass::Struct => format!(" {{{} members}}", parameter.members.len()),
        _ => format!(" {}x{}", parameter.rows, parameter.columns),
    };
    let array = if parameter.elements.is_empty() {
        String::new()
    } else {
        format!("[{}]", parameter.elements.len())
    };
    println!(
        "  #{index} {}{array}: {:?}/{:?}{shape}, {} default byte(s)",
        parameter.name,
        parameter.class,
        parameter.ty,
        parameter.data.len(),
    );
}

fn print_shader(shader: &Shader) {
    println!(
        "shader #{} ({}): {} code byte(s), {} cbuffer ref(s)",
        shader.shared_index,
        shader.stage.name(),
        shader.code.len(),
        shader.cbuffer_indices.len(),
    );
    for attribute in &shader.attributes {
        println!(
            "  attribute {:?} {:?}{} @ location {}",
            attribute.name, attribute.usage, attribute.index, attribute.location
        );
    }
    for sampler in &shader.samplers {
        println!(
            "  sampler {:?} -> texture {:?} (s{}, t{})",
            sampler.name, sampler.texture_name, sampler.sampler_slot, sampler.texture_slot
        );
    }
    for resource in &shader.resources {
        println!(
            "  resource {:?} {:?} stride {} @ u/t{}",
            resource.name, resource.kind, resource.element_size, resource.slot
        );
    }
}

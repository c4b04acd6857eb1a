//! `nebshade check`: builds the program on the CPU and reports what the
//! render loop would see.

use anyhow::{Context, Result};
use renderer::program::{self, UniformKind};
use renderer::ShaderSources;

use crate::cli::CheckArgs;
use crate::run::load_fragment;

pub fn check(args: CheckArgs) -> Result<()> {
    let sources = match args.fragment.as_deref() {
        Some(path) => load_fragment(path)?,
        None => ShaderSources::embedded(),
    };

    let linked = program::build(&sources).context("shader program failed to build")?;

    let uniforms = linked.uniforms();
    let (group, binding) = uniforms.binding();
    println!("program ok");
    println!(
        "uniform block: group={group} binding={binding} size={}",
        uniforms.block_size()
    );
    for (name, location) in uniforms.iter() {
        let kind = match location.kind {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
        };
        println!("  {name:<12} {kind:<6} offset={}", location.offset);
    }
    match linked.position_location() {
        Some(location) => println!("position attribute: location={location}"),
        None => println!("position attribute: none"),
    }
    Ok(())
}

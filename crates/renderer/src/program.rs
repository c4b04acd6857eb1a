//! Compiles and links the hero's vertex/fragment pair.
//!
//! GLSL is parsed with naga's frontend and validated before anything touches
//! the GPU, so compile diagnostics carry line/column context and the whole
//! build can be exercised without a device. "Linking" checks the interface
//! between the two stages and reflects the uniform block into a
//! [`UniformTable`]; the GPU backend later turns the linked program into a
//! render pipeline.

use std::borrow::Cow;
use std::collections::BTreeMap;

use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::{
    AddressSpace, Binding, Module, ResourceBinding, ScalarKind, ShaderStage, TypeInner,
    VectorSize,
};

use crate::error::{RenderError, ShaderKind};

/// Built-in vertex stage: passes the quad corner straight through.
pub const VERTEX_SHADER_GLSL: &str = include_str!("../shaders/hero.vert");

/// Built-in fragment stage: the procedural hero background.
pub const FRAGMENT_SHADER_GLSL: &str = include_str!("../shaders/hero.frag");

/// Uniform names the render loop writes every frame.
pub const UNIFORM_NAMES: [&str; 5] = ["time", "resolution", "mouse", "scroll", "theme"];

/// Vertex attribute fed from the quad buffer.
pub const POSITION_ATTRIBUTE: &str = "position";

/// Vertex and fragment source for one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSources {
    /// The sources baked into the binary.
    pub fn embedded() -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER_GLSL),
            fragment: Cow::Borrowed(FRAGMENT_SHADER_GLSL),
        }
    }

    /// Keeps the embedded vertex stage and swaps the fragment source.
    pub fn with_fragment(fragment: impl Into<String>) -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER_GLSL),
            fragment: Cow::Owned(fragment.into()),
        }
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::embedded()
    }
}

/// A parsed and validated shader stage.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    kind: ShaderKind,
    source: Cow<'static, str>,
    module: Module,
}

impl CompiledShader {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn module(&self) -> &Module {
        &self.module
    }
}

/// Compiles one stage, returning the rendered diagnostic on failure.
pub fn compile(kind: ShaderKind, source: Cow<'static, str>) -> Result<CompiledShader, RenderError> {
    let options = Options::from(kind.naga_stage());
    let module = match Frontend::default().parse(&options, &source) {
        Ok(module) => module,
        Err(errors) => {
            let log = errors.emit_to_string(&source);
            tracing::error!(stage = %kind, "shader compile error:\n{log}");
            return Err(RenderError::CompileFailure { stage: kind, log });
        }
    };

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::default());
    if let Err(err) = validator.validate(&module) {
        let log = err.emit_to_string(&source);
        tracing::error!(stage = %kind, "shader validation error:\n{log}");
        return Err(RenderError::CompileFailure { stage: kind, log });
    }

    tracing::debug!(stage = %kind, bytes = source.len(), "compiled shader");
    Ok(CompiledShader {
        kind,
        source,
        module,
    })
}

/// Links a vertex and fragment stage and resolves every uniform/attribute
/// location once.
pub fn link(vertex: CompiledShader, fragment: CompiledShader) -> Result<LinkedProgram, RenderError> {
    let mut problems = Vec::new();

    if vertex.kind != ShaderKind::Vertex {
        problems.push(format!("expected a vertex shader, got a {} shader", vertex.kind));
    }
    if fragment.kind != ShaderKind::Fragment {
        problems.push(format!(
            "expected a fragment shader, got a {} shader",
            fragment.kind
        ));
    }

    let vertex_outputs = stage_outputs(vertex.module(), ShaderStage::Vertex);
    let fragment_inputs = stage_inputs(fragment.module(), ShaderStage::Fragment);
    match (&vertex_outputs, &fragment_inputs) {
        (None, _) => problems.push("vertex shader has no `main` vertex entry point".to_string()),
        (_, None) => {
            problems.push("fragment shader has no `main` fragment entry point".to_string())
        }
        (Some(outputs), Some(inputs)) => {
            for (location, input) in inputs {
                match outputs.get(location) {
                    None => problems.push(format!(
                        "fragment input at location {location} is not written by the vertex shader"
                    )),
                    Some(output) if output != input => problems.push(format!(
                        "type mismatch at location {location}: vertex writes {output:?}, fragment reads {input:?}"
                    )),
                    Some(_) => {}
                }
            }
        }
    }

    let vertex_blocks = uniform_blocks(vertex.module());
    let fragment_blocks = uniform_blocks(fragment.module());
    for (binding, block) in &vertex_blocks {
        if let Some(other) = fragment_blocks.get(binding) {
            if other != block {
                problems.push(format!(
                    "uniform block at group {} binding {} differs between stages",
                    binding.0, binding.1
                ));
            }
        }
    }

    if !problems.is_empty() {
        let log = problems.join("\n");
        tracing::error!("program link error:\n{log}");
        return Err(RenderError::LinkFailure { log });
    }

    let mut blocks = vertex_blocks;
    blocks.extend(fragment_blocks);
    let uniforms = UniformTable::from_blocks(&blocks);
    let position = attribute_location(vertex.module(), POSITION_ATTRIBUTE);
    if position.is_none() {
        tracing::warn!(
            attribute = POSITION_ATTRIBUTE,
            "vertex attribute not found; the quad buffer will not be bound"
        );
    }

    Ok(LinkedProgram {
        vertex,
        fragment,
        uniforms,
        position,
    })
}

/// Compiles both stages and links them, stopping at the first failure.
pub fn build(sources: &ShaderSources) -> Result<LinkedProgram, RenderError> {
    let vertex = compile(ShaderKind::Vertex, sources.vertex.clone())?;
    let fragment = compile(ShaderKind::Fragment, sources.fragment.clone())?;
    link(vertex, fragment)
}

/// Output of a successful link.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    vertex: CompiledShader,
    fragment: CompiledShader,
    uniforms: UniformTable,
    position: Option<u32>,
}

impl LinkedProgram {
    pub fn vertex(&self) -> &CompiledShader {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledShader {
        &self.fragment
    }

    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }

    /// Location of the `position` attribute, if the vertex stage declares it.
    pub fn position_location(&self) -> Option<u32> {
        self.position
    }
}

/// Data type of a uniform the loop knows how to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
}

/// Where a named uniform lives inside the uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Name → location mapping for the program's uniform block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformTable {
    locations: BTreeMap<&'static str, UniformLocation>,
    block_size: u64,
    group: u32,
    binding: u32,
}

impl UniformTable {
    fn from_blocks(blocks: &BTreeMap<(u32, u32), UniformBlockLayout>) -> Self {
        let mut table = Self::default();
        for (&(group, binding), block) in blocks {
            let mut matched = false;
            for name in UNIFORM_NAMES {
                if table.locations.contains_key(name) {
                    continue;
                }
                if let Some(member) = block.members.iter().find(|m| m.name.as_deref() == Some(name))
                {
                    if let Some(kind) = member.kind {
                        table.locations.insert(
                            name,
                            UniformLocation {
                                offset: member.offset,
                                kind,
                            },
                        );
                        matched = true;
                    }
                }
            }
            if matched && table.block_size == 0 {
                table.block_size = u64::from(block.span);
                table.group = group;
                table.binding = binding;
            }
        }

        for name in UNIFORM_NAMES {
            if !table.locations.contains_key(name) {
                tracing::debug!(uniform = name, "uniform not present in program; it will not be written");
            }
        }
        table
    }

    /// Location for `name`, or `None` when the program does not use it.
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.locations.get(name).copied()
    }

    /// Size in bytes of the uniform block (0 when the program has none).
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// `(group, binding)` of the uniform block.
    pub fn binding(&self) -> (u32, u32) {
        (self.group, self.binding)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, UniformLocation)> + '_ {
        self.locations.iter().map(|(name, loc)| (*name, *loc))
    }
}

/// CPU staging copy of the uniform block, written by name each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    bytes: Vec<u8>,
}

impl UniformBlock {
    /// Allocates a zeroed block for `table`, padded to 16 bytes.
    pub fn for_table(table: &UniformTable) -> Self {
        let size = table.block_size().max(16).div_ceil(16) * 16;
        Self {
            bytes: vec![0; size as usize],
        }
    }

    pub fn set_float(&mut self, location: Option<UniformLocation>, value: f32) {
        if let Some(location) = location {
            if location.kind == UniformKind::Float {
                self.write(location.offset, bytemuck::bytes_of(&value));
            }
        }
    }

    pub fn set_vec2(&mut self, location: Option<UniformLocation>, value: [f32; 2]) {
        if let Some(location) = location {
            if location.kind == UniformKind::Vec2 {
                self.write(location.offset, bytemuck::cast_slice(&value));
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn write(&mut self, offset: u32, data: &[u8]) {
        let start = offset as usize;
        let end = start + data.len();
        if let Some(slot) = self.bytes.get_mut(start..end) {
            slot.copy_from_slice(data);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct UniformMember {
    name: Option<String>,
    offset: u32,
    kind: Option<UniformKind>,
    inner: TypeInner,
}

#[derive(Debug, Clone, PartialEq)]
struct UniformBlockLayout {
    span: u32,
    members: Vec<UniformMember>,
}

fn uniform_blocks(module: &Module) -> BTreeMap<(u32, u32), UniformBlockLayout> {
    let mut blocks = BTreeMap::new();
    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Uniform {
            continue;
        }
        let Some(&ResourceBinding { group, binding }) = var.binding.as_ref() else {
            continue;
        };
        let TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
            continue;
        };
        let members = members
            .iter()
            .map(|member| {
                let inner = module.types[member.ty].inner.clone();
                UniformMember {
                    name: member.name.clone(),
                    offset: member.offset,
                    kind: uniform_kind(&inner),
                    inner,
                }
            })
            .collect();
        blocks.insert(
            (group, binding),
            UniformBlockLayout {
                span: *span,
                members,
            },
        );
    }
    blocks
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match inner {
        TypeInner::Scalar(scalar) if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            Some(UniformKind::Float)
        }
        TypeInner::Vector {
            size: VectorSize::Bi,
            scalar,
        } if scalar.kind == ScalarKind::Float && scalar.width == 4 => Some(UniformKind::Vec2),
        _ => None,
    }
}

fn entry_point(module: &Module, stage: ShaderStage) -> Option<&wgpu::naga::Function> {
    module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage)
        .map(|entry| &entry.function)
}

/// Location-bound outputs of the stage's entry point.
fn stage_outputs(module: &Module, stage: ShaderStage) -> Option<BTreeMap<u32, TypeInner>> {
    let function = entry_point(module, stage)?;
    let mut outputs = BTreeMap::new();
    if let Some(result) = &function.result {
        collect_locations(module, result.ty, result.binding.as_ref(), &mut outputs);
    }
    Some(outputs)
}

/// Location-bound inputs of the stage's entry point.
fn stage_inputs(module: &Module, stage: ShaderStage) -> Option<BTreeMap<u32, TypeInner>> {
    let function = entry_point(module, stage)?;
    let mut inputs = BTreeMap::new();
    for argument in &function.arguments {
        collect_locations(module, argument.ty, argument.binding.as_ref(), &mut inputs);
    }
    Some(inputs)
}

fn collect_locations(
    module: &Module,
    ty: wgpu::naga::Handle<wgpu::naga::Type>,
    binding: Option<&Binding>,
    into: &mut BTreeMap<u32, TypeInner>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            into.insert(*location, module.types[ty].inner.clone());
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), into);
                }
            }
        }
    }
}

fn attribute_location(module: &Module, name: &str) -> Option<u32> {
    let function = entry_point(module, ShaderStage::Vertex)?;
    let named = function.arguments.iter().find_map(|argument| {
        match (&argument.name, &argument.binding) {
            (Some(arg_name), Some(Binding::Location { location, .. })) if arg_name == name => {
                Some(*location)
            }
            _ => None,
        }
    });
    if named.is_some() {
        return named;
    }

    // The GLSL frontend does not always carry input names onto entry
    // arguments; accept a lone unnamed vec2 input as the quad position.
    let mut unnamed = function.arguments.iter().filter_map(|argument| {
        match (&argument.name, &argument.binding) {
            (None, Some(Binding::Location { location, .. }))
                if uniform_kind(&module.types[argument.ty].inner) == Some(UniformKind::Vec2) =>
            {
                Some(*location)
            }
            _ => None,
        }
    });
    match (unnamed.next(), unnamed.next()) {
        (Some(location), None) => Some(location),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_program_builds_and_reflects_all_uniforms() {
        let program = build(&ShaderSources::embedded()).expect("embedded program links");
        let table = program.uniforms();
        for name in UNIFORM_NAMES {
            assert!(table.location(name).is_some(), "missing uniform {name}");
        }
        assert_eq!(table.location("time").map(|l| l.kind), Some(UniformKind::Float));
        assert_eq!(table.location("resolution").map(|l| l.kind), Some(UniformKind::Vec2));
        assert_eq!(table.location("mouse").map(|l| l.kind), Some(UniformKind::Vec2));
        assert!(table.block_size() >= 32);
        assert_eq!(table.binding(), (0, 0));
    }

    #[test]
    fn reflected_offsets_do_not_overlap() {
        let program = build(&ShaderSources::embedded()).expect("embedded program links");
        let mut spans: Vec<(u32, u32)> = program
            .uniforms()
            .iter()
            .map(|(_, loc)| {
                let size = match loc.kind {
                    UniformKind::Float => 4,
                    UniformKind::Vec2 => 8,
                };
                (loc.offset, loc.offset + size)
            })
            .collect();
        spans.sort_unstable();
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "overlapping uniforms: {spans:?}");
        }
    }

    #[test]
    fn invalid_fragment_source_reports_compile_failure() {
        let sources = ShaderSources::with_fragment("#version 450\nvoid main() { this is not glsl }\n");
        let err = build(&sources).expect_err("broken fragment must not build");
        match err {
            RenderError::CompileFailure { stage, log } => {
                assert_eq!(stage, ShaderKind::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unmatched_varying_reports_link_failure() {
        let fragment = "#version 450\n\
            layout(location = 3) in vec4 tint;\n\
            layout(location = 0) out vec4 fragColor;\n\
            void main() { fragColor = tint; }\n";
        let err = build(&ShaderSources::with_fragment(fragment)).expect_err("link must fail");
        assert!(matches!(err, RenderError::LinkFailure { .. }), "got {err:?}");
    }

    #[test]
    fn swapped_stages_fail_to_link() {
        let vertex = compile(ShaderKind::Vertex, Cow::Borrowed(VERTEX_SHADER_GLSL)).unwrap();
        let fragment = compile(ShaderKind::Fragment, Cow::Borrowed(FRAGMENT_SHADER_GLSL)).unwrap();
        let err = link(fragment, vertex).expect_err("stages are swapped");
        assert!(matches!(err, RenderError::LinkFailure { .. }));
    }

    #[test]
    fn missing_uniforms_are_not_fatal() {
        let fragment = "#version 450\n\
            layout(location = 0) out vec4 fragColor;\n\
            layout(std140, set = 0, binding = 0) uniform Params { float time; };\n\
            void main() { fragColor = vec4(vec3(fract(time)), 1.0); }\n";
        let program = build(&ShaderSources::with_fragment(fragment)).expect("program links");
        assert!(program.uniforms().location("time").is_some());
        assert!(program.uniforms().location("mouse").is_none());

        let mut block = UniformBlock::for_table(program.uniforms());
        let before = block.clone();
        block.set_vec2(program.uniforms().location("mouse"), [0.25, 0.75]);
        assert_eq!(block, before);
    }

    #[test]
    fn uniform_block_writes_at_reflected_offsets() {
        let mut table = UniformTable::default();
        table.block_size = 32;
        table.locations.insert(
            "time",
            UniformLocation {
                offset: 0,
                kind: UniformKind::Float,
            },
        );
        table.locations.insert(
            "mouse",
            UniformLocation {
                offset: 16,
                kind: UniformKind::Vec2,
            },
        );

        let mut block = UniformBlock::for_table(&table);
        block.set_float(table.location("time"), 2.5);
        block.set_vec2(table.location("mouse"), [0.25, 0.75]);
        // Kind mismatch is ignored rather than clobbering neighbouring members.
        block.set_float(table.location("mouse"), 9.0);

        let floats: &[f32] = bytemuck::cast_slice(block.as_bytes());
        assert_eq!(floats.len(), 8);
        assert_eq!(floats[0], 2.5);
        assert_eq!(floats[4], 0.25);
        assert_eq!(floats[5], 0.75);
    }
}

//! Reference PSSL toolchain for headless builds and tests.
//!
//! The dummy backend does not generate machine code. It checks the source
//! is well formed, eliminates resources the code never references, assigns
//! bind points in declaration order and packs constant buffers, then
//! serializes the resulting reflection as its "bytecode". Its output is a
//! deterministic function of the source and options, which keeps exports
//! byte-identical across runs.

mod layout;
mod parse;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::vendor::{
    CompileOptions, CompilerOutput, Diagnostic, DiagnosticLevel, InputAttribute,
    InternalBufferType, Program, ProgramBuffer, ProgramReader, ProgramSampler, PsslCompiler,
    Semantic, SourceProvider,
};

use layout::StructTable;
use parse::{Declaration, Member, ResourceClass};

/// Leading bytes of every dummy program.
pub const PROGRAM_MAGIC: &[u8; 4] = b"DPSL";

/// Extension of the debug database, which is the compiled source itself.
pub const SDB_EXTENSION: &str = ".sdb";

mod codes {
    pub const SOURCE_NOT_FOUND: u32 = 1001;
    pub const SYNTAX: u32 = 1002;
    pub const ENTRY_NOT_FOUND: u32 = 1003;
    pub const LAYOUT: u32 = 1004;
    pub const UNKNOWN_PRAGMA: u32 = 2001;
    pub const RESOURCE_ELIMINATED: u32 = 5001;
    pub const UNUSED_PARAMETER: u32 = 20087;
}

/// Serialized form of a dummy program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DummyProgram {
    profile: String,
    entry: String,
    unroll: bool,
    /// `(target, format)` pairs from `PSSL_target_output_format` pragmas.
    output_formats: Vec<(u32, String)>,
    reflection: Program,
}

/// In-process PSSL compiler and program reader.
#[derive(Debug, Default)]
pub struct DummyBackend;

impl DummyBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }
}

impl PsslCompiler for DummyBackend {
    fn run(&self, options: &CompileOptions, sources: &dyn SourceProvider) -> CompilerOutput {
        log::trace!(
            "DummyBackend: compiling {} ({})",
            options.main_source_file,
            options.target_profile.name()
        );
        let file = match sources.open_file(&options.main_source_file, None) {
            Ok(file) => file,
            Err(message) => {
                return CompilerOutput {
                    diagnostics: vec![Diagnostic {
                        level: DiagnosticLevel::Error,
                        code: codes::SOURCE_NOT_FOUND,
                        message,
                        location: None,
                    }],
                    ..Default::default()
                };
            }
        };

        let mut session = Session::new(options);
        let reflection = session.compile(file.text);
        let mut output = CompilerOutput {
            diagnostics: session.diagnostics,
            ..Default::default()
        };
        let Some(reflection) = reflection else {
            return output;
        };

        let program = DummyProgram {
            profile: options.target_profile.name().to_owned(),
            entry: options.entry_function_name.clone(),
            unroll: options.unroll_all_loops,
            output_formats: session.output_formats,
            reflection,
        };
        match bincode::serialize(&program) {
            Ok(bytes) => {
                output.program = PROGRAM_MAGIC.iter().copied().chain(bytes).collect();
                if options.sdb_cache {
                    output.sdb = file.text.as_bytes().to_vec();
                    output.sdb_ext = SDB_EXTENSION.into();
                }
            }
            Err(e) => output.diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Error,
                code: codes::SYNTAX,
                message: format!("failed to encode program: {e}"),
                location: None,
            }),
        }
        output
    }
}

impl ProgramReader for DummyBackend {
    fn load(&self, bytecode: &[u8]) -> Result<Program, CompileError> {
        let body = bytecode
            .strip_prefix(PROGRAM_MAGIC.as_slice())
            .ok_or_else(|| CompileError::InvalidProgram("missing dummy program magic".into()))?;
        let program: DummyProgram =
            bincode::deserialize(body).map_err(|e| CompileError::InvalidProgram(e.to_string()))?;
        Ok(program.reflection)
    }
}

/// State of one compile call.
struct Session<'o> {
    options: &'o CompileOptions,
    diagnostics: Vec<Diagnostic>,
    output_formats: Vec<(u32, String)>,
}

/// A constant buffer or resource declaration with its source position.
struct Binding<'s> {
    decl: Declaration,
    offset: usize,
    text: &'s str,
}

impl<'o> Session<'o> {
    fn new(options: &'o CompileOptions) -> Self {
        Self {
            options,
            diagnostics: Vec::new(),
            output_formats: Vec::new(),
        }
    }

    fn report(&mut self, level: DiagnosticLevel, code: u32, message: String, location: Option<(u32, u32)>) {
        if level == DiagnosticLevel::Warning && self.options.is_suppressed(code) {
            return;
        }
        self.diagnostics.push(Diagnostic {
            level,
            code,
            message,
            location,
        });
    }

    /// Compile `source` into its reflection, or `None` after reporting errors.
    fn compile(&mut self, source: &str) -> Option<Program> {
        let stripped = parse::strip_comments(source);
        let (text, directives) = parse::split_directives(&stripped);
        for directive in &directives {
            self.directive(directive);
        }

        let statements = match parse::split_statements(&text) {
            Ok(statements) => statements,
            Err(offset) => {
                self.report(
                    DiagnosticLevel::Error,
                    codes::SYNTAX,
                    "unbalanced braces".into(),
                    Some(parse::line_col(&text, offset)),
                );
                return None;
            }
        };

        let mut structs: Vec<(String, Vec<Member>)> = Vec::new();
        let mut bindings = Vec::new();
        let mut code = String::new();
        let mut entry = None;
        for statement in &statements {
            match parse::classify(statement.text) {
                Declaration::Struct { name, members } => structs.push((name, members)),
                decl @ (Declaration::ConstantBlock { .. }
                | Declaration::TypedConstantBuffer { .. }
                | Declaration::Resource { .. }) => bindings.push(Binding {
                    decl,
                    offset: statement.offset,
                    text: statement.text,
                }),
                Declaration::Function {
                    name,
                    params,
                    semantic,
                    body,
                } => {
                    if name == self.options.entry_function_name {
                        entry = Some((params, semantic, body));
                    }
                    code.push_str(statement.text);
                    code.push('\n');
                }
                Declaration::Other => {
                    code.push_str(statement.text);
                    code.push('\n');
                }
            }
        }

        let Some((params, _, body)) = entry else {
            self.report(
                DiagnosticLevel::Error,
                codes::ENTRY_NOT_FOUND,
                format!("entry function '{}' not found", self.options.entry_function_name),
                None,
            );
            return None;
        };

        let referenced: HashSet<&str> = parse::identifiers(&code).collect();
        let struct_table: StructTable<'_> = structs
            .iter()
            .map(|(name, members)| (name.as_str(), members.as_slice()))
            .collect();

        let mut program = Program::default();
        let mut failed = false;
        let mut next = HashMap::<&'static str, u32>::new();
        let mut allocate = |category: &'static str| {
            let slot = next.entry(category).or_insert(0);
            *slot += 1;
            *slot - 1
        };

        for binding in &bindings {
            let location = Some(parse::line_col(&text, binding.offset));
            match &binding.decl {
                Declaration::ConstantBlock { name, members } => {
                    if !members.iter().any(|m| referenced.contains(m.name.as_str())) {
                        self.eliminated(name, location);
                        continue;
                    }
                    match layout::block_size(members, &struct_table) {
                        Ok(stride) => program.buffers.push(ProgramBuffer {
                            name: name.clone(),
                            internal_type: InternalBufferType::Cbuffer,
                            bind_point: allocate("cbuffer"),
                            stride,
                        }),
                        Err(e) => {
                            self.report(DiagnosticLevel::Error, codes::LAYOUT, format!("{name}: {e}"), location);
                            failed = true;
                        }
                    }
                }
                Declaration::TypedConstantBuffer { ty, name } => {
                    if !referenced.contains(name.as_str()) {
                        self.eliminated(name, location);
                        continue;
                    }
                    let size = match struct_table.get(ty.as_str()) {
                        Some(members) => layout::block_size(members, &struct_table),
                        None => Err(format!("unknown type '{ty}'")),
                    };
                    match size {
                        Ok(stride) => program.buffers.push(ProgramBuffer {
                            name: name.clone(),
                            internal_type: InternalBufferType::Cbuffer,
                            bind_point: allocate("cbuffer"),
                            stride,
                        }),
                        Err(e) => {
                            self.report(DiagnosticLevel::Error, codes::LAYOUT, format!("{name}: {e}"), location);
                            failed = true;
                        }
                    }
                }
                Declaration::Resource {
                    class,
                    ty,
                    element,
                    name,
                    count,
                } => {
                    if !referenced.contains(name.as_str()) {
                        self.eliminated(name, location);
                        continue;
                    }
                    let names: Vec<String> = match count {
                        Some(count) => (0..*count).map(|i| format!("{name}[{i}]")).collect(),
                        None => vec![name.clone()],
                    };
                    let stride = buffer_stride(ty, element.as_deref(), &struct_table);
                    for name in names {
                        let (internal_type, category) = match class {
                            ResourceClass::Texture => (InternalBufferType::TextureSampler, "srv"),
                            ResourceClass::Buffer => (InternalBufferType::Srv, "srv"),
                            ResourceClass::ReadWrite => (InternalBufferType::Uav, "uav"),
                            ResourceClass::Sampler => {
                                program.sampler_states.push(ProgramSampler {
                                    name,
                                    bind_point: allocate("sampler"),
                                });
                                continue;
                            }
                        };
                        program.buffers.push(ProgramBuffer {
                            name,
                            internal_type,
                            bind_point: allocate(category),
                            stride,
                        });
                    }
                }
                _ => log::trace!("DummyBackend: ignoring {}", binding.text),
            }
        }

        if failed {
            return None;
        }

        program.input_attributes = self.input_attributes(&params, &body, &struct_table);
        Some(program)
    }

    fn directive(&mut self, directive: &parse::Directive) {
        let Some(rest) = directive.text.strip_prefix("#pragma") else {
            return;
        };
        let rest = rest.trim();
        if let Some(args) = rest
            .strip_prefix("PSSL_target_output_format")
            .map(|a| a.trim().trim_start_matches('(').trim_end_matches(')'))
        {
            let mut words = args.split_whitespace();
            if let (Some("target"), Some(Ok(target)), Some(format)) =
                (words.next(), words.next().map(str::parse::<u32>), words.next())
            {
                self.output_formats.push((target, format.to_owned()));
                return;
            }
        }
        self.report(
            DiagnosticLevel::Warning,
            codes::UNKNOWN_PRAGMA,
            format!("unrecognised pragma '{}'", directive.text),
            Some((directive.line, 1)),
        );
    }

    fn eliminated(&mut self, name: &str, location: Option<(u32, u32)>) {
        self.report(
            DiagnosticLevel::Info,
            codes::RESOURCE_ELIMINATED,
            format!("'{name}' is never referenced and was eliminated"),
            location,
        );
    }

    /// Entry inputs: parameters with a semantic, and semantic-carrying
    /// members of struct parameters.
    fn input_attributes(
        &mut self,
        params: &[Member],
        body: &str,
        structs: &StructTable<'_>,
    ) -> Vec<InputAttribute> {
        let used: HashSet<&str> = parse::identifiers(body).collect();
        let mut inputs = Vec::new();
        for param in params {
            if param.has_qualifier("out") {
                continue;
            }
            if !used.contains(param.name.as_str()) {
                self.report(
                    DiagnosticLevel::Warning,
                    codes::UNUSED_PARAMETER,
                    format!("parameter '{}' is unused", param.name),
                    None,
                );
            }
            match (&param.semantic, structs.get(param.ty.as_str())) {
                (Some(semantic), _) => inputs.push(semantic.as_str()),
                (None, Some(members)) => {
                    inputs.extend(members.iter().filter_map(|m| m.semantic.as_deref()))
                }
                (None, None) => {}
            }
        }

        let mut resource_index = 0;
        inputs
            .into_iter()
            .map(|semantic| {
                let (semantic_name, semantic_index) = split_semantic(semantic);
                let class = classify_semantic(&semantic_name);
                let attribute = InputAttribute {
                    semantic_name,
                    semantic_index,
                    semantic: class,
                    resource_index: if class.is_hardware_fed() { 0 } else { resource_index },
                };
                if !class.is_hardware_fed() {
                    resource_index += 1;
                }
                attribute
            })
            .collect()
    }
}

fn buffer_stride(ty: &str, element: Option<&str>, structs: &StructTable<'_>) -> u32 {
    if ty.ends_with("ByteBuffer") {
        return 4;
    }
    if ty.starts_with("Texture") || ty.starts_with("RW_Texture") {
        return 0;
    }
    element
        .and_then(|e| layout::element_size(e, structs).ok())
        .unwrap_or(0)
}

/// `TEXCOORD12` -> (`TEXCOORD`, 12).
fn split_semantic(semantic: &str) -> (String, u32) {
    let name = semantic.trim_end_matches(|c: char| c.is_ascii_digit());
    let index = semantic[name.len()..].parse().unwrap_or(0);
    (name.to_owned(), index)
}

fn classify_semantic(name: &str) -> Semantic {
    match name {
        "S_POINT_COORD" => Semantic::SpriteCoord,
        "S_PRIMITIVE_ID" | "S_SAMPLE_INDEX" => Semantic::Implicit,
        n if n.starts_with("S_") => Semantic::System,
        _ => Semantic::UserDefined,
    }
}

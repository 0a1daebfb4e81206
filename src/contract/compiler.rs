//! Solidity compiler adapter
//!
//! Drives `solc --standard-json` as a subprocess: the request goes in on
//! stdin, the JSON result comes back on stdout. One source unit is compiled
//! per call and it must contain exactly one contract.

use crate::contract::abi::ContractAbi;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Virtual file name the source is compiled under
pub const SOURCE_NAME: &str = "contract.sol";

/// Optimizer runs used unless configured otherwise
pub const DEFAULT_OPTIMIZER_RUNS: u32 = 500;

/// Compiler errors
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Compiler crashed (exit code {}): {stderr}", exit_label(.code))]
    CompilerCrashed { code: Option<i32>, stderr: String },
    #[error("Compilation failed: {}", .messages.join("; "))]
    CompilationError { messages: Vec<String> },
    #[error("Compiler output contains no contract")]
    NoContractProduced,
    #[error("Compiler produced multiple contracts ({}), cannot tell which one to deploy", .names.join(", "))]
    AmbiguousContract { names: Vec<String> },
    #[error("Invalid compiler output: {0}")]
    InvalidOutput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "killed by signal".to_string(),
    }
}

/// Bytecode and interface of the single compiled contract
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    /// Contract name as declared in the source
    pub contract_name: String,
    /// Creation bytecode
    pub bytecode: Vec<u8>,
    pub abi: ContractAbi,
}

impl CompiledArtifact {
    pub fn bytecode_hex(&self) -> String {
        hex::encode(&self.bytecode)
    }
}

#[derive(Debug, Deserialize)]
struct StandardOutput {
    #[serde(default)]
    errors: Vec<Diagnostic>,
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, OutputContract>>,
}

#[derive(Debug, Deserialize)]
struct Diagnostic {
    severity: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct OutputContract {
    #[serde(default)]
    abi: Value,
    evm: OutputEvm,
}

#[derive(Debug, Deserialize)]
struct OutputEvm {
    bytecode: OutputBytecode,
}

#[derive(Debug, Deserialize)]
struct OutputBytecode {
    object: String,
}

/// Parse the compiler's standard JSON output
pub fn parse_standard_output(raw: &[u8]) -> Result<CompiledArtifact, CompilerError> {
    let output: StandardOutput = serde_json::from_slice(raw)?;

    let messages: Vec<String> = output
        .errors
        .iter()
        .filter(|d| d.severity == "error")
        .map(|d| d.message.clone())
        .collect();
    if !messages.is_empty() {
        return Err(CompilerError::CompilationError { messages });
    }

    for warning in output.errors.iter().filter(|d| d.severity != "error") {
        log::debug!("solc {}: {}", warning.severity, warning.message);
    }

    let mut contracts = output
        .contracts
        .into_iter()
        .find(|(file, _)| file == SOURCE_NAME)
        .map(|(_, contracts)| contracts)
        .unwrap_or_default();

    if contracts.len() > 1 {
        return Err(CompilerError::AmbiguousContract {
            names: contracts.into_keys().collect(),
        });
    }

    let (contract_name, contract) = contracts
        .pop_first()
        .ok_or(CompilerError::NoContractProduced)?;

    let object = contract.evm.bytecode.object;
    let bytecode = hex::decode(object.trim_start_matches("0x"))
        .map_err(|e| CompilerError::InvalidOutput(format!("bytecode of {}: {}", contract_name, e)))?;

    Ok(CompiledArtifact {
        contract_name,
        bytecode,
        abi: ContractAbi::new(contract.abi),
    })
}

/// Subprocess-backed Solidity compiler
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    program: PathBuf,
    args: Vec<String>,
    optimizer_runs: u32,
}

impl SolcCompiler {
    /// Compiler at `program`, invoked as `program --standard-json`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec!["--standard-json".to_string()],
            optimizer_runs: DEFAULT_OPTIMIZER_RUNS,
        }
    }

    /// Replace the argument list passed to the compiler
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_optimizer_runs(mut self, runs: u32) -> Self {
        self.optimizer_runs = runs;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Standard JSON request for a single source unit
    pub fn standard_input(&self, source: &str) -> Value {
        json!({
            "language": "Solidity",
            "sources": {
                SOURCE_NAME: { "content": source }
            },
            "settings": {
                "optimizer": {
                    "enabled": true,
                    "runs": self.optimizer_runs
                },
                "outputSelection": {
                    SOURCE_NAME: { "*": ["abi", "evm.bytecode"] }
                }
            }
        })
    }

    /// Compile `source` and return its only contract
    pub async fn compile(&self, source: &str) -> Result<CompiledArtifact, CompilerError> {
        let input = serde_json::to_vec(&self.standard_input(source))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Feed stdin while the output is drained so neither pipe can fill up
        let feeder = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let written = stdin.write_all(&input).await;
                drop(stdin);
                written
            })
        });

        let output = child.wait_with_output().await?;

        if let Some(feeder) = feeder {
            match feeder.await {
                Ok(Ok(())) => {}
                // The compiler quit without reading; its exit status says why
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(e.into()),
                Err(e) => return Err(std::io::Error::new(std::io::ErrorKind::Other, e).into()),
            }
        }

        if !output.status.success() {
            return Err(CompilerError::CompilerCrashed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let artifact = parse_standard_output(&output.stdout)?;
        log::info!(
            "Compiled {} ({} bytes of bytecode)",
            artifact.contract_name,
            artifact.bytecode.len()
        );
        Ok(artifact)
    }
}

impl Default for SolcCompiler {
    fn default() -> Self {
        Self::new("solc")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    pub(crate) const SIMPLE_STORAGE: &str = r#"pragma solidity ^0.4.0;
contract SimpleStorage {
    uint storedData;

    function SimpleStorage() {
        storedData = 0x1337;
    }

    function set(uint x) {
        storedData = x;
    }

    function get() constant returns (uint) {
        return storedData;
    }
}"#;

    /// What solc reports for `SIMPLE_STORAGE`
    pub(crate) fn simple_storage_output() -> Value {
        json!({
            "contracts": {
                "contract.sol": {
                    "SimpleStorage": {
                        "abi": [
                            {"constant": false, "inputs": [{"name": "x", "type": "uint256"}], "name": "set", "outputs": [], "payable": false, "type": "function"},
                            {"constant": true, "inputs": [], "name": "get", "outputs": [{"name": "", "type": "uint256"}], "payable": false, "type": "function"},
                            {"inputs": [], "payable": false, "type": "constructor"}
                        ],
                        "evm": {"bytecode": {"object": "6060604052341561000f57600080fd5b61133760005560b9806100236000396000f300", "opcodes": "", "sourceMap": ""}}
                    }
                }
            },
            "errors": [
                {"severity": "warning", "message": "No visibility specified. Defaulting to \"public\".", "type": "Warning"}
            ],
            "sources": {"contract.sol": {"id": 0}}
        })
    }

    /// A compiler that swallows its input and prints the file at `output`
    pub(crate) fn fake_compiler(output: &Path) -> SolcCompiler {
        SolcCompiler::new("sh").with_args([
            "-c".to_string(),
            format!("cat > /dev/null; cat '{}'", output.display()),
        ])
    }

    pub(crate) fn write_fixture(dir: &Path, value: &Value) -> PathBuf {
        let path = dir.join("solc-output.json");
        std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_standard_input_shape() {
        let compiler = SolcCompiler::default();
        let input = compiler.standard_input("contract A {}");

        assert_eq!(input["language"], "Solidity");
        assert_eq!(input["sources"]["contract.sol"]["content"], "contract A {}");
        assert_eq!(input["settings"]["optimizer"]["enabled"], true);
        assert_eq!(input["settings"]["optimizer"]["runs"], 500);
        assert_eq!(
            input["settings"]["outputSelection"]["contract.sol"]["*"],
            json!(["abi", "evm.bytecode"])
        );
    }

    #[test]
    fn test_parse_single_contract() {
        let raw = serde_json::to_vec(&simple_storage_output()).unwrap();
        let artifact = parse_standard_output(&raw).unwrap();

        assert_eq!(artifact.contract_name, "SimpleStorage");
        assert!(!artifact.bytecode.is_empty());
        assert!(artifact.bytecode_hex().starts_with("6060604052"));
        assert!(artifact.abi.has_function("set"));
        assert!(artifact.abi.has_function("get"));
    }

    #[test]
    fn test_no_contract_produced() {
        let raw = br#"{"contracts": {"contract.sol": {}}, "sources": {}}"#;
        assert!(matches!(
            parse_standard_output(raw),
            Err(CompilerError::NoContractProduced)
        ));

        // Source unit missing from the output altogether
        assert!(matches!(
            parse_standard_output(b"{}"),
            Err(CompilerError::NoContractProduced)
        ));
    }

    #[test]
    fn test_ambiguous_contract() {
        let raw = serde_json::to_vec(&json!({
            "contracts": {"contract.sol": {
                "A": {"abi": [], "evm": {"bytecode": {"object": "00"}}},
                "B": {"abi": [], "evm": {"bytecode": {"object": "01"}}}
            }}
        }))
        .unwrap();

        match parse_standard_output(&raw) {
            Err(CompilerError::AmbiguousContract { names }) => assert_eq!(names, vec!["A", "B"]),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_error_diagnostics_preserved() {
        let raw = serde_json::to_vec(&json!({
            "errors": [
                {"severity": "warning", "message": "unused variable"},
                {"severity": "error", "message": "Expected ';' but got '}'"},
                {"severity": "error", "message": "Undeclared identifier."}
            ],
            "contracts": {"contract.sol": {
                "A": {"abi": [], "evm": {"bytecode": {"object": "00"}}}
            }}
        }))
        .unwrap();

        match parse_standard_output(&raw) {
            Err(CompilerError::CompilationError { messages }) => {
                assert_eq!(
                    messages,
                    vec!["Expected ';' but got '}'", "Undeclared identifier."]
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_bytecode_hex() {
        let raw = br#"{"contracts": {"contract.sol": {"A": {"abi": [], "evm": {"bytecode": {"object": "zz"}}}}}}"#;
        assert!(matches!(
            parse_standard_output(raw),
            Err(CompilerError::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_compile_through_subprocess() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = write_fixture(dir.path(), &simple_storage_output());

        let artifact = fake_compiler(&fixture)
            .compile(SIMPLE_STORAGE)
            .await
            .unwrap();

        assert!(!artifact.bytecode.is_empty());
        let functions = artifact.abi.function_names();
        assert!(functions.contains(&"set"));
        assert!(functions.contains(&"get"));
    }

    #[tokio::test]
    async fn test_large_input_and_output_do_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = write_fixture(dir.path(), &simple_storage_output());
        // Writes a large block of whitespace before it reads any input
        let compiler = SolcCompiler::new("sh").with_args([
            "-c".to_string(),
            format!(
                "head -c 262144 /dev/zero | tr '\\000' ' '; cat '{}'; cat > /dev/null",
                fixture.display()
            ),
        ]);
        let source = format!("{}\n// {}", SIMPLE_STORAGE, "x".repeat(262_144));

        let artifact = tokio::time::timeout(Duration::from_secs(20), compiler.compile(&source))
            .await
            .expect("compiler pipes deadlocked")
            .unwrap();
        assert_eq!(artifact.contract_name, "SimpleStorage");
    }

    #[tokio::test]
    async fn test_compiler_crash_reports_exit_code_and_stderr() {
        let compiler = SolcCompiler::new("sh")
            .with_args(["-c", "cat > /dev/null; echo 'internal compiler error' >&2; exit 3"]);

        match compiler.compile(SIMPLE_STORAGE).await {
            Err(CompilerError::CompilerCrashed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "internal compiler error");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_compiler_binary() {
        let compiler = SolcCompiler::new("/nonexistent/solc-binary");
        assert!(matches!(
            compiler.compile(SIMPLE_STORAGE).await,
            Err(CompilerError::IoError(_))
        ));
    }
}

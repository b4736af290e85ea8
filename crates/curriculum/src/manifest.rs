use std::{
    ffi::OsString,
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use hex::encode as hex_encode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ScheduleConfig;
use crate::errors::{CurriculumError, Result};
use crate::sink::OutputPaths;

pub const MANIFEST_VERSION: u32 = 1;
const MANIFEST_SUFFIX: &str = ".manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub sha256: String,
    pub bytes: u64,
}

impl FileRecord {
    pub fn from_path(path: &Path) -> Result<Self> {
        let sha256 = sha256_file(path)?;
        let bytes = path.metadata()?.len();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                CurriculumError::Manifest(format!(
                    "output file name is not valid UTF-8: {}",
                    path.display()
                ))
            })?
            .to_string();
        Ok(Self {
            filename,
            sha256,
            bytes,
        })
    }
}

/// Record of a finished curriculum build, stored next to its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub version: u32,
    pub created_unix_timestamp: u64,
    pub input: PathBuf,
    pub pool_size: usize,
    pub seed: u64,
    pub schedule: ScheduleConfig,
    pub rows_written: usize,
    pub structured: FileRecord,
    pub text: FileRecord,
}

impl RunManifest {
    pub fn new(
        input: &Path,
        pool_size: usize,
        seed: u64,
        schedule: ScheduleConfig,
        rows_written: usize,
        paths: &OutputPaths,
    ) -> Result<Self> {
        Ok(Self {
            version: MANIFEST_VERSION,
            created_unix_timestamp: unix_timestamp(),
            input: input.to_path_buf(),
            pool_size,
            seed,
            schedule,
            rows_written,
            structured: FileRecord::from_path(&paths.structured)?,
            text: FileRecord::from_path(&paths.text)?,
        })
    }

    /// Re-hashes both outputs and fails on the first mismatch.
    pub fn verify(&self, paths: &OutputPaths) -> Result<()> {
        for (record, path) in [
            (&self.structured, &paths.structured),
            (&self.text, &paths.text),
        ] {
            let actual = sha256_file(path)?;
            if actual != record.sha256 {
                return Err(CurriculumError::Manifest(format!(
                    "{} has sha256 {} but the manifest records {}",
                    path.display(),
                    actual,
                    record.sha256
                )));
            }
        }
        Ok(())
    }
}

/// `<base>.manifest.json`.
pub fn manifest_path(base: &Path) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(MANIFEST_SUFFIX);
    PathBuf::from(name)
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, manifest).map_err(|err| {
        CurriculumError::Manifest(format!("failed to encode {}: {err}", path.display()))
    })?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<RunManifest> {
    if !path.is_file() {
        return Err(CurriculumError::Manifest(format!(
            "manifest not found at {}",
            path.display()
        )));
    }
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|err| {
        CurriculumError::Manifest(format!("failed to decode {}: {err}", path.display()))
    })
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex_encode(hasher.finalize()))
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

//! Pipeline driver: runs the enabled `steps.*` stages in order.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::data::filter::{threshold_filter, ThresholdSettings};
use crate::data::flag::{flag_regions, regions_from_options};
use crate::data::loader::{load_cube, load_mask, write_cube, write_mask};
use crate::data::model::{Cube, Mask};
use crate::error::StepError;
use crate::options::{ModuleOptions, ParameterStore};

// ---------------------------------------------------------------------------
// Step order
// ---------------------------------------------------------------------------

/// Every pipeline stage in execution order: `steps.*` switch and the options
/// module the stage reads.
pub const STEP_ORDER: &[(&str, &str)] = &[
    ("doSubcube", "import"),
    ("doFlag", "flag"),
    ("doSmooth", "smooth"),
    ("doScaleNoise", "scaleNoise"),
    ("doSCfind", "SCfind"),
    ("doThreshold", "threshold"),
    ("doWavelet", "wavelet"),
    ("doCNHI", "CNHI"),
    ("doMerge", "merge"),
    ("doReliability", "reliability"),
    ("doParameterise", "parameters"),
    ("doOptical", "optical"),
    ("doWriteFilteredCube", "writeCat"),
    ("doWriteNoiseCube", "writeCat"),
    ("doWriteMask", "writeCat"),
    ("doWriteCat", "writeCat"),
    ("doMom0", "writeCat"),
    ("doMom1", "writeCat"),
    ("doCubelets", "writeCat"),
];

// ---------------------------------------------------------------------------
// Step trait
// ---------------------------------------------------------------------------

/// Which shared resources a step writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Alters {
    pub cube: bool,
    pub mask: bool,
}

/// Where output products go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub basename: String,
    pub extension: String,
    pub overwrite: bool,
}

impl OutputPaths {
    /// Output settings from `writeCat.*`, defaulting to the directory, stem
    /// and extension of `import.inFile`.
    pub fn from_options(store: &ParameterStore) -> Result<Self, StepError> {
        let import = store.module_or_empty("import");
        let write_cat = store.module_or_empty("writeCat");
        let in_file = import.str_or("inFile", "")?;
        let in_path = Path::new(in_file);

        let default_dir = in_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let default_base = in_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("cubefind");
        let extension = in_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("json");

        let dir = match write_cat.str_or("outputDir", "")? {
            "" => default_dir,
            dir => PathBuf::from(dir),
        };
        let basename = match write_cat.str_or("basename", "")? {
            "" => default_base,
            base => base,
        };
        Ok(Self {
            dir,
            basename: basename.to_string(),
            extension: extension.to_string(),
            overwrite: write_cat.bool_or("overwrite", true)?,
        })
    }

    /// `{dir}/{basename}_{product}.{extension}`
    pub fn product(&self, product: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{product}.{}", self.basename, self.extension))
    }
}

/// Shared handles a step operates on.
pub struct StepData<'a> {
    pub cube: &'a mut Cube,
    pub mask: &'a mut Mask,
    pub outputs: &'a OutputPaths,
}

/// A pipeline stage. Receives only its own module's options.
pub trait Step {
    /// Switch under `steps` enabling this stage, e.g. `doThreshold`.
    fn switch(&self) -> &'static str;

    fn alters(&self) -> Alters;

    fn run(&self, options: &ModuleOptions, data: &mut StepData<'_>) -> Result<(), StepError>;
}

// ---------------------------------------------------------------------------
// Built-in steps
// ---------------------------------------------------------------------------

/// Blank `flag.regions` in the cube.
pub struct FlagStep;

impl Step for FlagStep {
    fn switch(&self) -> &'static str {
        "doFlag"
    }

    fn alters(&self) -> Alters {
        Alters {
            cube: true,
            mask: false,
        }
    }

    fn run(&self, options: &ModuleOptions, data: &mut StepData<'_>) -> Result<(), StepError> {
        if options.contains("file") {
            warn!("flag.file is not supported; only flag.regions is applied");
        }
        if !options.contains("regions") {
            warn!("Flagging enabled but no flag.regions given");
            return Ok(());
        }
        let regions = regions_from_options(options.require_sequence("regions")?)?;
        flag_regions(data.cube, &regions);
        Ok(())
    }
}

/// Threshold finder.
pub struct ThresholdStep;

impl Step for ThresholdStep {
    fn switch(&self) -> &'static str {
        "doThreshold"
    }

    fn alters(&self) -> Alters {
        Alters {
            cube: false,
            mask: true,
        }
    }

    fn run(&self, options: &ModuleOptions, data: &mut StepData<'_>) -> Result<(), StepError> {
        let settings = ThresholdSettings::from_options(options)?;
        threshold_filter(data.mask, data.cube, &settings)?;
        info!(
            "Threshold finder: {} positive, {} negative voxels",
            data.mask.count(Mask::POSITIVE),
            data.mask.count(Mask::NEGATIVE)
        );
        Ok(())
    }
}

/// Write the (flagged) cube.
pub struct WriteFilteredCubeStep;

impl Step for WriteFilteredCubeStep {
    fn switch(&self) -> &'static str {
        "doWriteFilteredCube"
    }

    fn alters(&self) -> Alters {
        Alters::default()
    }

    fn run(&self, _options: &ModuleOptions, data: &mut StepData<'_>) -> Result<(), StepError> {
        let path = data.outputs.product("filtered");
        write_cube(&path, data.cube, data.outputs.overwrite)?;
        info!("Wrote filtered cube to {}", path.display());
        Ok(())
    }
}

/// Write the detection mask.
pub struct WriteMaskStep;

impl Step for WriteMaskStep {
    fn switch(&self) -> &'static str {
        "doWriteMask"
    }

    fn alters(&self) -> Alters {
        Alters::default()
    }

    fn run(&self, _options: &ModuleOptions, data: &mut StepData<'_>) -> Result<(), StepError> {
        let path = data.outputs.product("mask");
        write_mask(&path, data.mask, data.outputs.overwrite)?;
        info!("Wrote mask to {}", path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline driver
// ---------------------------------------------------------------------------

/// Steps that ran and steps that were enabled but have no implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

/// Runs the enabled steps of a validated option store, one at a time.
pub struct Pipeline {
    store: ParameterStore,
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    /// A pipeline with the built-in steps registered.
    pub fn new(store: ParameterStore) -> Self {
        Self {
            store,
            steps: vec![
                Box::new(FlagStep),
                Box::new(ThresholdStep),
                Box::new(WriteFilteredCubeStep),
                Box::new(WriteMaskStep),
            ],
        }
    }

    pub fn options(&self) -> &ParameterStore {
        &self.store
    }

    /// Add an implementation for a stage, replacing any registered for the
    /// same switch. The switch must name a stage in [`STEP_ORDER`].
    pub fn register(&mut self, step: Box<dyn Step>) -> Result<(), StepError> {
        let switch = step.switch();
        if !STEP_ORDER.iter().any(|&(s, _)| s == switch) {
            warn!("Refusing to register step for unknown switch steps.{switch}");
            return Err(StepError::UnknownStep(switch.to_string()));
        }
        self.steps.retain(|s| s.switch() != switch);
        self.steps.push(step);
        Ok(())
    }

    /// Switches set under `steps`, in execution order.
    pub fn enabled_steps(&self) -> Result<Vec<&'static str>, StepError> {
        let switches = self.store.module_or_empty("steps");
        let mut enabled = Vec::new();
        for &(switch, _) in STEP_ORDER {
            if switches.bool_or(switch, false)? {
                enabled.push(switch);
            }
        }
        Ok(enabled)
    }

    /// Load `import.inFile` and, if given, `import.maskFile`.
    pub fn load_inputs(&self) -> Result<(Cube, Mask), StepError> {
        let import = self.store.module_or_empty("import");
        let in_file = import.str_or("inFile", "")?;
        if in_file.is_empty() {
            return Err(StepError::NoCube);
        }
        let cube = load_cube(Path::new(in_file))?;
        info!(
            "Loaded cube {in_file} ({}, {} NaN voxels)",
            cube.shape(),
            cube.nan_count()
        );
        let mask = match import.str_or("maskFile", "")? {
            "" => Mask::empty(cube.shape()),
            mask_file => {
                info!("Loading input mask {mask_file}");
                load_mask(Path::new(mask_file), cube.shape())?
            }
        };
        Ok((cube, mask))
    }

    /// Load the inputs and run every enabled step.
    pub fn run(&self) -> Result<(Cube, Mask, RunSummary), StepError> {
        let (mut cube, mut mask) = self.load_inputs()?;
        let summary = self.run_on(&mut cube, &mut mask)?;
        Ok((cube, mask, summary))
    }

    /// Run every enabled step on the given cube and mask.
    pub fn run_on(&self, cube: &mut Cube, mask: &mut Mask) -> Result<RunSummary, StepError> {
        if mask.shape() != cube.shape() {
            return Err(StepError::ShapeMismatch {
                expected: cube.shape(),
                actual: mask.shape(),
            });
        }
        let outputs = OutputPaths::from_options(&self.store)?;
        let mut summary = RunSummary::default();

        for switch in self.enabled_steps()? {
            let Some(step) = self.steps.iter().find(|s| s.switch() == switch) else {
                warn!("Step {switch} is not available in this build; skipping");
                summary.skipped.push(switch);
                continue;
            };
            let module = STEP_ORDER
                .iter()
                .find(|(s, _)| *s == switch)
                .map(|&(_, module)| module)
                .unwrap_or("steps");
            let alters = step.alters();
            info!(
                "Running {switch} (alters cube: {}, mask: {})",
                alters.cube, alters.mask
            );
            let options = self.store.module_or_empty(module);
            let mut data = StepData {
                cube: &mut *cube,
                mask: &mut *mask,
                outputs: &outputs,
            };
            step.run(&options, &mut data)?;
            summary.executed.push(switch);
        }
        Ok(summary)
    }
}

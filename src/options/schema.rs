//! The fixed table of known `module.parameter` keys and their types.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// TypeTag – the primitive type a parameter is declared with
// ---------------------------------------------------------------------------

/// Declared type of a recognised parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    String,
    Array,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::String => "string",
            TypeTag::Array => "array",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Schema table
// ---------------------------------------------------------------------------

/// One recognised `module.parameter` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaEntry {
    pub module: &'static str,
    pub parameter: &'static str,
    pub tag: TypeTag,
}

const fn entry(module: &'static str, parameter: &'static str, tag: TypeTag) -> SchemaEntry {
    SchemaEntry {
        module,
        parameter,
        tag,
    }
}

use TypeTag::{Array, Bool, Float, Int, String as Text};

/// Every parameter the pipeline accepts. Keys missing here are ignored by
/// the parser, so new parameters must be added to this table.
static SCHEMA: &[SchemaEntry] = &[
    // steps
    entry("steps", "doSubcube", Bool),
    entry("steps", "doFlag", Bool),
    entry("steps", "doSmooth", Bool),
    entry("steps", "doScaleNoise", Bool),
    entry("steps", "doSCfind", Bool),
    entry("steps", "doThreshold", Bool),
    entry("steps", "doWavelet", Bool),
    entry("steps", "doCNHI", Bool),
    entry("steps", "doMerge", Bool),
    entry("steps", "doReliability", Bool),
    entry("steps", "doParameterise", Bool),
    entry("steps", "doWriteFilteredCube", Bool),
    entry("steps", "doWriteNoiseCube", Bool),
    entry("steps", "doWriteMask", Bool),
    entry("steps", "doWriteCat", Bool),
    entry("steps", "doMom0", Bool),
    entry("steps", "doMom1", Bool),
    entry("steps", "doCubelets", Bool),
    entry("steps", "doDebug", Bool),
    entry("steps", "doOptical", Bool),
    // import
    entry("import", "inFile", Text),
    entry("import", "weightsFile", Text),
    entry("import", "maskFile", Text),
    entry("import", "weightsFunction", Text),
    entry("import", "subcubeMode", Text),
    entry("import", "subcube", Array),
    // flag
    entry("flag", "regions", Array),
    entry("flag", "file", Text),
    // optical
    entry("optical", "sourceCatalogue", Text),
    entry("optical", "spatSize", Float),
    entry("optical", "specSize", Float),
    entry("optical", "storeMultiCat", Bool),
    // smooth
    entry("smooth", "kernel", Text),
    entry("smooth", "edgeMode", Text),
    entry("smooth", "kernelX", Float),
    entry("smooth", "kernelY", Float),
    entry("smooth", "kernelZ", Float),
    // scaleNoise
    entry("scaleNoise", "method", Text),
    entry("scaleNoise", "statistic", Text),
    entry("scaleNoise", "fluxRange", Text),
    entry("scaleNoise", "edgeX", Int),
    entry("scaleNoise", "edgeY", Int),
    entry("scaleNoise", "edgeZ", Int),
    entry("scaleNoise", "scaleX", Bool),
    entry("scaleNoise", "scaleY", Bool),
    entry("scaleNoise", "scaleZ", Bool),
    entry("scaleNoise", "windowSpatial", Int),
    entry("scaleNoise", "windowSpectral", Int),
    entry("scaleNoise", "gridSpatial", Int),
    entry("scaleNoise", "gridSpectral", Int),
    entry("scaleNoise", "interpolation", Text),
    // SCfind
    entry("SCfind", "threshold", Float),
    entry("SCfind", "sizeFilter", Float),
    entry("SCfind", "maskScaleXY", Float),
    entry("SCfind", "maskScaleZ", Float),
    entry("SCfind", "edgeMode", Text),
    entry("SCfind", "rmsMode", Text),
    entry("SCfind", "fluxRange", Text),
    entry("SCfind", "kernels", Array),
    entry("SCfind", "kernelUnit", Text),
    entry("SCfind", "verbose", Bool),
    // CNHI
    entry("CNHI", "pReq", Float),
    entry("CNHI", "qReq", Float),
    entry("CNHI", "minScale", Int),
    entry("CNHI", "maxScale", Int),
    entry("CNHI", "medianTest", Bool),
    entry("CNHI", "verbose", Int),
    // wavelet
    entry("wavelet", "threshold", Float),
    entry("wavelet", "scaleXY", Int),
    entry("wavelet", "scaleZ", Int),
    entry("wavelet", "positivity", Bool),
    entry("wavelet", "iterations", Int),
    // threshold
    entry("threshold", "threshold", Float),
    entry("threshold", "clipMethod", Text),
    entry("threshold", "rmsMode", Text),
    entry("threshold", "fluxRange", Text),
    entry("threshold", "verbose", Bool),
    // merge
    entry("merge", "radiusX", Int),
    entry("merge", "radiusY", Int),
    entry("merge", "radiusZ", Int),
    entry("merge", "minSizeX", Int),
    entry("merge", "minSizeY", Int),
    entry("merge", "minSizeZ", Int),
    entry("merge", "positivity", Bool),
    // reliability
    entry("reliability", "parSpace", Array),
    entry("reliability", "logPars", Array),
    entry("reliability", "autoKernel", Bool),
    entry("reliability", "scaleKernel", Float),
    entry("reliability", "usecov", Bool),
    entry("reliability", "negPerBin", Float),
    entry("reliability", "skellamTol", Float),
    entry("reliability", "kernel", Array),
    entry("reliability", "fMin", Float),
    entry("reliability", "threshold", Float),
    entry("reliability", "makePlot", Bool),
    // parameters
    entry("parameters", "getUncertainties", Bool),
    entry("parameters", "fitBusyFunction", Bool),
    entry("parameters", "optimiseMask", Bool),
    entry("parameters", "dilateMask", Bool),
    entry("parameters", "dilateThreshold", Float),
    entry("parameters", "dilatePixMax", Int),
    entry("parameters", "dilateChan", Int),
    // writeCat
    entry("writeCat", "overwrite", Bool),
    entry("writeCat", "compress", Bool),
    entry("writeCat", "outputDir", Text),
    entry("writeCat", "basename", Text),
    entry("writeCat", "writeASCII", Bool),
    entry("writeCat", "writeXML", Bool),
    entry("writeCat", "writeSQL", Bool),
    entry("writeCat", "parameters", Array),
];

/// Declared type of `module.parameter`, or `None` if the key is not recognised.
pub fn lookup(module: &str, parameter: &str) -> Option<TypeTag> {
    SCHEMA
        .iter()
        .find(|e| e.module == module && e.parameter == parameter)
        .map(|e| e.tag)
}

/// All recognised keys, in declaration order.
pub fn entries() -> impl Iterator<Item = &'static SchemaEntry> {
    SCHEMA.iter()
}

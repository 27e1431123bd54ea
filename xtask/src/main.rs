// Licensed under the Apache-2.0 license

use bee_image_header::ImageId;
use clap::{Parser, Subcommand, ValueEnum};
use clap_num::maybe_hex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

mod clippy;
mod format;
mod header;
mod image;
mod precheckin;

pub(crate) static PROJECT_ROOT: LazyLock<PathBuf> = LazyLock::new(|| {
    let current_dir = std::env::current_dir().unwrap_or_default();
    option_env!("CARGO_MANIFEST_DIR")
        .map(Path::new)
        .filter(|p| p.exists())
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(current_dir)
});

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Xtask {
    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum Layout {
    /// Two executable banks with a persisted selector
    DualBank,
    /// One executable bank plus a staging area
    SingleBank,
}

#[derive(Subcommand)]
enum Commands {
    /// Wrap a payload in a bee image header
    ImageGen {
        /// Image id, by name (app-patch) or number (0x2793)
        #[arg(long, value_parser = parse_image_id)]
        id: ImageId,

        #[arg(long)]
        payload: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Record a SHA-256 of the payload instead of a CRC16
        #[arg(long, default_value_t = false)]
        sha256: bool,

        /// Stamp the ROM UUID so the image can chain to the ROM
        #[arg(long, default_value_t = false)]
        chained: bool,

        /// Execute in place from this address
        #[arg(long, value_parser=maybe_hex::<u32>)]
        xip: Option<u32>,

        /// Load destination in RAM; the payload is copied from flash at boot
        #[arg(long, value_parser=maybe_hex::<u32>, conflicts_with = "xip", requires = "load_src")]
        load_dst: Option<u32>,

        /// Flash address the payload is loaded from
        #[arg(long, value_parser=maybe_hex::<u32>)]
        load_src: Option<u32>,

        #[arg(long, default_value_t = 0)]
        secure_version: u8,

        /// Image version as major.minor.revision
        #[arg(long)]
        version: Option<String>,
    },
    /// Lay out an OTA bank: descriptor followed by the given images
    OtaGen {
        /// Absolute flash address of the bank
        #[arg(long, value_parser=maybe_hex::<u32>)]
        base: u32,

        /// Images in the form <id>=<file>, placed in the given order
        #[arg(long = "image", value_name = "ID=FILE", num_args = 1.., required = true)]
        images: Vec<String>,

        /// Descriptor version as major.minor.revision
        #[arg(long)]
        version: Option<String>,

        #[arg(long)]
        output: PathBuf,
    },
    /// Run the boot ROM validation against a flash dump
    ///
    /// Runs in integrity-only mode: the CRC or SHA-256 payload check and the
    /// structural and entry checks match the part. The host crypto cannot
    /// check AES-CMAC or RSA signatures made by production tooling, so the
    /// image MAC and signature are not verified.
    #[command(verbatim_doc_comment)]
    ImageVerify {
        /// Flash dump
        #[arg(long)]
        file: PathBuf,

        /// Absolute flash address of the first byte of the dump
        #[arg(long, value_parser=maybe_hex::<u32>)]
        base: Option<u32>,

        #[arg(long, value_enum, default_value_t = Layout::DualBank)]
        layout: Layout,

        /// Active bank (0 or 1)
        #[arg(long, default_value_t = 0)]
        bank: u8,

        #[arg(long, value_parser = parse_image_id)]
        id: ImageId,

        /// Validate the staged update instead of the active image
        #[arg(long, default_value_t = false)]
        candidate: bool,
    },
    /// Run clippy on all targets
    Clippy,
    /// Check that all files are formatted
    Format,
    /// Run pre-check-in checks
    Precheckin,
    /// Check files for Apache license header
    HeaderCheck,
    /// Add Apache license header to files where it is missing
    HeaderFix,
    /// Run tests
    Test,
}

const IMAGE_NAMES: &[(&str, ImageId)] = &[
    ("sccd", ImageId::Sccd),
    ("occd", ImageId::Occd),
    ("factory-code", ImageId::FactoryCode),
    ("ota", ImageId::Ota),
    ("secure-boot", ImageId::SecureBoot),
    ("rom-patch", ImageId::RomPatch),
    ("app-patch", ImageId::AppPatch),
    ("app-data1", ImageId::AppData1),
    ("app-data2", ImageId::AppData2),
    ("app-data3", ImageId::AppData3),
    ("app-data4", ImageId::AppData4),
    ("app-data5", ImageId::AppData5),
    ("app-config-file", ImageId::AppConfigFile),
    ("upper-stack", ImageId::UpperStack),
    ("bt-stack-patch", ImageId::BtStackPatch),
    ("user-data2", ImageId::UserData2),
    ("user-data", ImageId::UserData),
];

pub(crate) fn parse_image_id(s: &str) -> Result<ImageId, String> {
    if let Some((_, id)) = IMAGE_NAMES.iter().find(|(name, _)| *name == s) {
        return Ok(*id);
    }
    let raw = maybe_hex::<u16>(s)?;
    ImageId::try_from(raw).map_err(|_| format!("unknown image id {s}"))
}

fn main() {
    let cli = Xtask::parse();
    let result = match &cli.xtask {
        Commands::ImageGen {
            id,
            payload,
            output,
            sha256,
            chained,
            xip,
            load_dst,
            load_src,
            secure_version,
            version,
        } => image::image_gen(image::ImageGenArgs {
            id: *id,
            payload,
            output,
            sha256: *sha256,
            chained: *chained,
            xip: *xip,
            load: load_dst.zip(*load_src),
            secure_version: *secure_version,
            version: version.as_deref(),
        }),
        Commands::OtaGen {
            base,
            images,
            version,
            output,
        } => image::ota_gen(*base, images, version.as_deref(), output),
        Commands::ImageVerify {
            file,
            base,
            layout,
            bank,
            id,
            candidate,
        } => image::image_verify(image::ImageVerifyArgs {
            file,
            base: *base,
            layout: *layout,
            bank: *bank,
            id: *id,
            candidate: *candidate,
        }),
        Commands::Clippy => clippy::clippy(),
        Commands::Precheckin => precheckin::precheckin(),
        Commands::Format => format::format(),
        Commands::HeaderFix => header::fix(),
        Commands::HeaderCheck => header::check(),
        Commands::Test => test::test(),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
}

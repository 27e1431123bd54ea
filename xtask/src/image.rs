// Licensed under the Apache-2.0 license

use anyhow::{anyhow, bail, Context, Result};
use bee_config::boot::BankId;
use bee_config::flash::{FlashLayout, SECTOR_SIZE};
use bee_config::{AuthMode, DEFAULT_ROM_UUID};
use bee_image_gen::{ImageBuilder, Integrity, OtaHeaderBuilder};
use bee_image_header::{HeaderSubVersion, ImageId, ImageSubVersion, OTA_HEADER_SIZE};
use bee_rom_common::{boot_image, validate_candidate};
use bee_testing_common::TestRig;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Once;

use crate::Layout;

pub(crate) struct ImageGenArgs<'a> {
    pub id: ImageId,
    pub payload: &'a PathBuf,
    pub output: &'a PathBuf,
    pub sha256: bool,
    pub chained: bool,
    pub xip: Option<u32>,
    /// Load destination and source.
    pub load: Option<(u32, u32)>,
    pub secure_version: u8,
    pub version: Option<&'a str>,
}

pub(crate) struct ImageVerifyArgs<'a> {
    pub file: &'a PathBuf,
    pub base: Option<u32>,
    pub layout: Layout,
    pub bank: u8,
    pub id: ImageId,
    pub candidate: bool,
}

fn load_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn save_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn parse_version(s: &str) -> Result<(u32, u32, u32)> {
    let parts = s
        .split('.')
        .map(|part| part.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| anyhow!("Invalid version {s}"))?;
    match parts.as_slice() {
        [major, minor, revision] => Ok((*major, *minor, *revision)),
        _ => bail!("Version must be major.minor.revision, got {s}"),
    }
}

fn image_version(s: &str) -> Result<ImageSubVersion> {
    let (major, minor, revision) = parse_version(s)?;
    if major > 0xF || minor > 0xFF || revision > 0x7FFF {
        bail!("Image version {s} out of range");
    }
    let mut version = ImageSubVersion::default();
    version.set_major(major as u8);
    version.set_minor(minor as u8);
    version.set_revision(revision as u16);
    Ok(version)
}

fn header_version(s: &str) -> Result<HeaderSubVersion> {
    let (major, minor, revision) = parse_version(s)?;
    let field = |v: u32| u8::try_from(v).map_err(|_| anyhow!("Descriptor version {s} out of range"));
    let mut version = HeaderSubVersion::default();
    version.set_major(field(major)?);
    version.set_minor(field(minor)?);
    version.set_revision(field(revision)?);
    Ok(version)
}

fn build_image(args: &ImageGenArgs, payload: &[u8]) -> Result<Vec<u8>> {
    let mut builder = ImageBuilder::new(args.id, payload).secure_version(args.secure_version);
    if args.sha256 {
        builder = builder.integrity(Integrity::Sha256);
    }
    if args.chained {
        builder = builder.uuid(DEFAULT_ROM_UUID);
    }
    if let Some(exe_base) = args.xip {
        builder = builder.xip(exe_base);
    }
    if let Some((dst, src)) = args.load {
        builder = builder.load(src, dst, payload.len() as u32);
    }
    if let Some(version) = args.version {
        builder = builder.version(image_version(version)?);
    }
    Ok(builder.build())
}

pub(crate) fn image_gen(args: ImageGenArgs) -> Result<()> {
    let payload = load_file(args.payload)?;
    let image = build_image(&args, &payload)?;
    save_file(args.output, &image)?;
    println!(
        "Wrote {:?} image ({} bytes) to {}",
        args.id,
        image.len(),
        args.output.display()
    );
    Ok(())
}

fn parse_image_arg(arg: &str) -> Result<(ImageId, PathBuf)> {
    let (id, file) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected <id>=<file>, got {arg}"))?;
    let id = crate::parse_image_id(id).map_err(|e| anyhow!(e))?;
    Ok((id, PathBuf::from(file)))
}

/// Descriptor followed by each image on the next sector boundary.
fn layout_bank(base: u32, images: &[(ImageId, Vec<u8>)], version: Option<&str>) -> Result<Vec<u8>> {
    let mut ota = OtaHeaderBuilder::new();
    if let Some(version) = version {
        ota = ota.version(header_version(version)?);
    }
    let mut placed: Vec<(ImageId, usize)> = Vec::new();
    let mut offset = OTA_HEADER_SIZE as usize;
    for (id, image) in images {
        if *id == ImageId::Ota || placed.iter().any(|(placed_id, _)| placed_id == id) {
            bail!("{id:?} cannot be placed in the bank");
        }
        let addr = base
            .checked_add(offset as u32)
            .ok_or_else(|| anyhow!("Bank overflows the address space"))?;
        ota = ota.entry(*id, addr, image.len() as u32);
        placed.push((*id, offset));
        offset = (offset + image.len()).next_multiple_of(SECTOR_SIZE as usize);
    }

    let mut bank = vec![0xFF; offset];
    bank[..OTA_HEADER_SIZE as usize].copy_from_slice(&ota.build());
    for ((_, offset), (_, image)) in placed.iter().zip(images) {
        bank[*offset..*offset + image.len()].copy_from_slice(image);
    }
    Ok(bank)
}

pub(crate) fn ota_gen(
    base: u32,
    images: &[String],
    version: Option<&str>,
    output: &PathBuf,
) -> Result<()> {
    let images = images
        .iter()
        .map(|arg| {
            let (id, file) = parse_image_arg(arg)?;
            Ok((id, load_file(&file)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let bank = layout_bank(base, &images, version)?;
    save_file(output, &bank)?;
    println!(
        "Wrote OTA bank at {base:#x} with {} images ({} bytes) to {}",
        images.len(),
        bank.len(),
        output.display()
    );
    Ok(())
}

struct Stdout;

impl fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        print!("{s}");
        Ok(())
    }
}

fn verify_rig(args: &ImageVerifyArgs, dump: &[u8]) -> Result<TestRig> {
    let layout = match args.layout {
        Layout::DualBank => FlashLayout::dual_bank(),
        Layout::SingleBank => FlashLayout::single_bank(),
    };
    let bank = match args.bank {
        0 => BankId::Bank0,
        1 if layout.supports_bank_switch() => BankId::Bank1,
        other => bail!("Bank {other} is not available in this layout"),
    };
    let base = args.base.unwrap_or(layout.ota_bank_0.base);
    // The host crypto doubles cannot check production MACs or signatures.
    let rig = TestRig::new(layout).with_auth_mode(AuthMode::IntegrityOnly);
    rig.bank.select(Some(bank));
    if !rig.flash.contains(base, dump.len()) {
        bail!(
            "Dump of {} bytes at {base:#x} does not fit the flash layout",
            dump.len()
        );
    }
    rig.flash.program(base, dump);
    Ok(rig)
}

pub(crate) fn image_verify(args: ImageVerifyArgs) -> Result<()> {
    let dump = load_file(args.file)?;
    let rig = verify_rig(&args, &dump)?;
    static PRINTER: Once = Once::new();
    PRINTER.call_once(|| romtime::set_printer(Box::leak(Box::new(Stdout))));
    let env = rig.env();
    if args.candidate {
        let (addr, size) =
            validate_candidate(&env, args.id).map_err(|e| anyhow!("{:?}: {e}", args.id))?;
        println!("{:?} candidate valid at {addr:#x}, {size} bytes", args.id);
    } else {
        let image = boot_image(&env, args.id).map_err(|e| anyhow!("{:?}: {e}", args.id))?;
        println!(
            "{:?} valid at {:#x}, {} bytes",
            image.id, image.addr, image.size
        );
        if let Some(entry) = image.entry_ptr {
            println!("Entry point {entry:#x}");
        }
    }
    Ok(())
}

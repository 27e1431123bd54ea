// Licensed under the Apache-2.0 license

use bee_config::boot::BankId;
use bee_image_gen::{ImageBuilder, OtaHeaderBuilder};
use bee_image_header::{
    HeaderSubVersion, ImageId, ImageSubVersion, ImageVersion, ERASED_WORD, OTA_HEADER_SIZE,
};
use bee_rom_common::{
    get_active_bank_image_size_by_img_id, get_active_bank_image_version,
    get_active_ota_bank_addr, get_header_addr_by_img_id, get_image_addr_in_bank,
    get_image_size_in_bank, get_temp_ota_bank_addr_by_img_id, get_temp_ota_bank_size_by_img_id,
    is_ota_support_bank_switch,
};
use bee_testing_common::{BankBuilder, FixedBank, TestRig};

fn image(id: ImageId, len: usize) -> Vec<u8> {
    ImageBuilder::new(id, &vec![id as u8; len]).build()
}

/// Both banks populated with the same two images at different offsets.
/// Returns the AppData1 address of each bank.
fn populated_dual_bank() -> (TestRig, u32, u32) {
    let rig = TestRig::dual_bank();
    let bank0 = BankBuilder::new(rig.layout.ota_bank_0.base)
        .image(ImageId::AppData1, image(ImageId::AppData1, 0x300))
        .image(ImageId::AppData2, image(ImageId::AppData2, 0x1800))
        .program(&rig.flash);
    let bank1 = BankBuilder::new(rig.layout.ota_bank_1.base)
        .image(ImageId::AppData2, image(ImageId::AppData2, 0x2800))
        .image(ImageId::AppData1, image(ImageId::AppData1, 0x500))
        .program(&rig.flash);
    (rig, bank0[0], bank1[1])
}

#[test]
fn test_bank_switch_support() {
    assert!(is_ota_support_bank_switch(&TestRig::dual_bank().env()));
    assert!(!is_ota_support_bank_switch(&TestRig::single_bank().env()));
}

#[test]
fn test_active_bank_lookup() {
    let (rig, app0, _) = populated_dual_bank();
    let env = rig.env();
    let bank0 = rig.layout.ota_bank_0.base;
    assert_eq!(get_active_ota_bank_addr(&env), bank0);
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::Ota), bank0);
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppData1), app0);
    assert_eq!(
        get_active_bank_image_size_by_img_id(&env, ImageId::AppData1),
        0x400 + 0x300
    );
    assert_eq!(
        get_active_bank_image_size_by_img_id(&env, ImageId::Ota),
        OTA_HEADER_SIZE
    );
    // Not present in the table.
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppPatch), 0);
    assert_eq!(get_active_bank_image_size_by_img_id(&env, ImageId::AppPatch), 0);
}

#[test]
fn test_active_and_temp_are_symmetric() {
    let (rig, app0, app1) = populated_dual_bank();
    let bank0 = rig.layout.ota_bank_0.base;
    let bank1 = rig.layout.ota_bank_1.base;

    for (active, active_base, temp_base, active_app, temp_app, temp_len) in [
        (BankId::Bank0, bank0, bank1, app0, app1, 0x500),
        (BankId::Bank1, bank1, bank0, app1, app0, 0x300),
    ] {
        rig.bank.select(Some(active));
        let env = rig.env();
        assert_eq!(get_active_ota_bank_addr(&env), active_base);
        assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppData1), active_app);
        assert_eq!(get_temp_ota_bank_addr_by_img_id(&env, ImageId::Ota), temp_base);
        assert_eq!(
            get_temp_ota_bank_addr_by_img_id(&env, ImageId::AppData1),
            temp_app
        );
        assert_eq!(
            get_temp_ota_bank_size_by_img_id(&env, ImageId::AppData1),
            0x400 + temp_len
        );
        assert_eq!(
            get_temp_ota_bank_size_by_img_id(&env, ImageId::Ota),
            OTA_HEADER_SIZE
        );
    }
}

#[test]
fn test_unreadable_selector() {
    let (mut rig, app0, _) = populated_dual_bank();
    rig.bank = FixedBank::unreadable();
    let env = rig.env();
    assert_eq!(get_active_ota_bank_addr(&env), 0);
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::Ota), 0);
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppData1), 0);
    // Bank 0 is treated as the inactive one.
    assert_eq!(
        get_temp_ota_bank_addr_by_img_id(&env, ImageId::Ota),
        rig.layout.ota_bank_0.base
    );
    assert_eq!(get_temp_ota_bank_addr_by_img_id(&env, ImageId::AppData1), app0);
}

#[test]
fn test_single_bank_staging() {
    let rig = TestRig::single_bank();
    let addrs = BankBuilder::new(rig.layout.ota_bank_0.base)
        .image(ImageId::AppPatch, image(ImageId::AppPatch, 0x100))
        .program(&rig.flash);
    let env = rig.env();
    let tmp = rig.layout.ota_tmp;

    assert_eq!(get_active_ota_bank_addr(&env), rig.layout.ota_bank_0.base);
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppPatch), addrs[0]);
    assert_eq!(get_temp_ota_bank_addr_by_img_id(&env, ImageId::Ota), 0);
    assert_eq!(get_temp_ota_bank_size_by_img_id(&env, ImageId::Ota), 0);
    for id in [ImageId::AppPatch, ImageId::AppData5, ImageId::BtStackPatch] {
        assert_eq!(get_temp_ota_bank_addr_by_img_id(&env, id), tmp.base);
        assert_eq!(get_temp_ota_bank_size_by_img_id(&env, id), tmp.size);
    }
}

#[test]
fn test_ids_outside_ota_range() {
    let (rig, _, _) = populated_dual_bank();
    let env = rig.env();
    rig.flash.reset_read_count();
    for id in [
        ImageId::Sccd,
        ImageId::Occd,
        ImageId::FactoryCode,
        ImageId::UserData,
        ImageId::UserData2,
    ] {
        assert_eq!(get_header_addr_by_img_id(&env, id), 0);
        assert_eq!(get_active_bank_image_size_by_img_id(&env, id), 0);
        assert_eq!(get_temp_ota_bank_addr_by_img_id(&env, id), 0);
        assert_eq!(get_temp_ota_bank_size_by_img_id(&env, id), 0);
    }
    assert_eq!(rig.flash.read_count(), 0);
}

#[test]
fn test_erased_entries_read_as_zero() {
    let rig = TestRig::dual_bank();
    let bank0 = rig.layout.ota_bank_0.base;
    BankBuilder::new(bank0)
        .descriptor(|ota| {
            ota.entry(ImageId::AppData3, bank0 + 0x8000, ERASED_WORD)
                .entry(ImageId::AppData4, ERASED_WORD, 0x1000)
        })
        .program(&rig.flash);
    let env = rig.env();
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppData3), bank0 + 0x8000);
    assert_eq!(get_active_bank_image_size_by_img_id(&env, ImageId::AppData3), 0);
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppData4), 0);
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppData5), 0);
    assert_eq!(get_active_bank_image_size_by_img_id(&env, ImageId::AppData5), 0);
}

#[test]
fn test_invalid_descriptor() {
    let rig = TestRig::dual_bank();
    let bank0 = rig.layout.ota_bank_0.base;
    let mut ota = OtaHeaderBuilder::new().entry(ImageId::AppData1, bank0 + 0x1000, 0x800);
    ota.header_mut().magic_pattern = 0.into();
    rig.flash.program(bank0, &ota.build());
    let env = rig.env();

    // The descriptor address itself needs no validation.
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::Ota), bank0);
    assert_eq!(get_header_addr_by_img_id(&env, ImageId::AppData1), 0);
    assert_eq!(get_active_bank_image_size_by_img_id(&env, ImageId::AppData1), 0);
    // Raw table access does not check the descriptor.
    assert_eq!(
        get_image_addr_in_bank(&env, bank0, ImageId::AppData1),
        Some(bank0 + 0x1000)
    );
    assert_eq!(get_image_size_in_bank(&env, bank0, ImageId::AppData1), Some(0x800));
    assert_eq!(get_image_addr_in_bank(&env, bank0, ImageId::Ota), None);
}

#[test]
fn test_temp_descriptor_slot_without_bank_content() {
    let rig = TestRig::dual_bank();
    let env = rig.env();
    assert_eq!(
        get_temp_ota_bank_size_by_img_id(&env, ImageId::Ota),
        OTA_HEADER_SIZE
    );
    assert_eq!(
        get_temp_ota_bank_addr_by_img_id(&env, ImageId::Ota),
        rig.layout.ota_bank_1.base
    );
    assert_eq!(get_temp_ota_bank_addr_by_img_id(&env, ImageId::AppData1), 0);
    assert_eq!(get_temp_ota_bank_size_by_img_id(&env, ImageId::AppData1), 0);
}

#[test]
fn test_image_versions() {
    let rig = TestRig::dual_bank();
    let mut version = ImageSubVersion::default();
    version.set_major(1);
    version.set_minor(4);
    version.set_revision(27);
    let mut ota_version = HeaderSubVersion::default();
    ota_version.set_major(2);
    BankBuilder::new(rig.layout.ota_bank_0.base)
        .descriptor(|ota| ota.version(ota_version))
        .image(
            ImageId::AppData1,
            ImageBuilder::new(ImageId::AppData1, &[0; 4])
                .version(version)
                .build(),
        )
        .program(&rig.flash);
    let env = rig.env();
    assert_eq!(
        get_active_bank_image_version(&env, ImageId::Ota),
        Some(ImageVersion::OtaHeader(ota_version))
    );
    assert_eq!(
        get_active_bank_image_version(&env, ImageId::AppData1),
        Some(ImageVersion::Image(version))
    );
    assert_eq!(get_active_bank_image_version(&env, ImageId::AppData2), None);
}

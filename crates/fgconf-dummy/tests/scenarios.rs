//! End-to-end configuration scenarios against the emulated gauge

use fgconf_core::apply::{ConfigVersion, NoProgress, VersionPolicy, VERSION_STAMP_BLOCK};
use fgconf_core::block::{checksum, updated_checksum, BlockId, BLOCK_SIZE};
use fgconf_core::device::{AttachOptions, DeviceHandle};
use fgconf_core::gate::BQ27441_G1;
use fgconf_core::mode::{ConfigMode, MODE_TRANSITION_TIMEOUT_US};
use fgconf_core::pack::PackParameters;
use fgconf_core::profile::builtin::ZEROGRAVITAS;
use fgconf_core::registers::{commands, subcommands};
use fgconf_core::pack::STATE_BLOCK;
use fgconf_core::{Clock, Error, Gauge, RegisterWidth, TransportError};
use fgconf_dummy::{DummyClock, DummyConfig, DummyGauge, Transaction};

fn sealed_gauge() -> Gauge<DummyGauge, DummyClock> {
    Gauge::new(DummyGauge::new_default(), DummyClock::new())
}

/// Sealed chip with every flag clear
fn quiet_gauge() -> Gauge<DummyGauge, DummyClock> {
    let config = DummyConfig {
        itpor: false,
        battery_detected: false,
        ..Default::default()
    };
    Gauge::new(DummyGauge::new(config), DummyClock::new())
}

fn flag_reads(log: &[Transaction]) -> usize {
    log.iter()
        .filter(|t| {
            **t == Transaction::Read {
                reg: commands::FLAGS,
                width: RegisterWidth::Byte,
            }
        })
        .count()
}

#[test]
fn test_apply_three_blocks_to_sealed_chip() {
    let mut gauge = quiet_gauge();
    let blocks = &ZEROGRAVITAS.commands[..3];

    assert!(gauge.read_flags().unwrap().is_empty());
    gauge.check_firmware_version(BQ27441_G1).unwrap();
    gauge
        .apply_golden_configuration(blocks, ConfigVersion::new(5), &mut NoProgress)
        .unwrap();

    let dummy = gauge.transport();
    assert_eq!(
        dummy.control_commands(),
        [
            subcommands::DEVICE_TYPE,
            subcommands::FW_VERSION,
            subcommands::CONTROL_STATUS,
            subcommands::UNSEAL_KEY,
            subcommands::UNSEAL_KEY,
            subcommands::CONTROL_STATUS,
            subcommands::SET_CFGUPDATE,
            subcommands::DM_CODE,
            subcommands::SOFT_RESET,
            subcommands::SEALED,
        ]
    );

    for cmd in blocks {
        assert_eq!(dummy.block(cmd.block), cmd.payload, "block {}", cmd.block);
    }
    assert_eq!(dummy.block(BlockId::new(0x40, 0))[3], 5);
    assert_eq!(dummy.block(BlockId::new(0x31, 0)), [0u8; 32]);

    assert!(dummy.is_sealed());
    assert!(!dummy.in_cfgupdate());
    assert_eq!(gauge.mode(), ConfigMode::Sealed);

    // Every block: select, payload, checksum, re-select, checksum read-back
    let log = dummy.transactions();
    for cmd in blocks {
        let select = Transaction::Write {
            reg: commands::DATA_CLASS,
            data: vec![cmd.block.class, cmd.block.index],
        };
        let payload = Transaction::Write {
            reg: commands::BLOCK_DATA,
            data: cmd.payload.to_vec(),
        };
        let at = log
            .iter()
            .position(|t| *t == payload)
            .unwrap_or_else(|| panic!("payload for {} never written", cmd.block));

        assert_eq!(log[at - 1], select, "block {}", cmd.block);
        assert_eq!(
            log[at + 1],
            Transaction::Write {
                reg: commands::BLOCK_DATA_CHECKSUM,
                data: vec![cmd.checksum],
            }
        );
        assert_eq!(log[at + 2], select, "block {}", cmd.block);
        assert_eq!(
            log[at + 3],
            Transaction::Read {
                reg: commands::BLOCK_DATA_CHECKSUM,
                width: RegisterWidth::Byte,
            }
        );
    }

    // CFGUPMODE is polled until it appears, and later until it clears
    let control_at = |sub: u16| {
        log.iter()
            .position(|t| t.control_command() == Some(sub))
            .unwrap_or_else(|| panic!("sub-command 0x{:04X} never sent", sub))
    };
    let first_select = log
        .iter()
        .position(|t| t.is_write_to(commands::DATA_CLASS))
        .unwrap();
    let polls = DummyConfig::default().enter_latency_polls as usize + 1;
    assert_eq!(
        flag_reads(&log[control_at(subcommands::SET_CFGUPDATE)..first_select]),
        polls
    );
    assert_eq!(
        flag_reads(&log[control_at(subcommands::SOFT_RESET)..control_at(subcommands::SEALED)]),
        DummyConfig::default().exit_latency_polls as usize + 1
    );

    assert!(gauge.read_flags().unwrap().is_empty());
}

#[test]
fn test_write_byte_reports_checksum_mismatch() {
    let mut gauge = sealed_gauge();
    let block = BlockId::new(0x51, 0);
    gauge.enter_config_mode().unwrap();
    gauge.transport_mut().faults_mut().corrupt_checksum = Some(block);

    // The corrupted register reads one above the real checksum of a blank block
    let seen = checksum(&[0u8; BLOCK_SIZE]).wrapping_add(1);
    assert_eq!(
        gauge.write_byte(block, 4, 0x33),
        Err(Error::ChecksumMismatch {
            block,
            expected: updated_checksum(seen, 0x00, 0x33),
            found: seen,
        })
    );
    assert_eq!(gauge.transport().block(block), [0u8; BLOCK_SIZE]);
}

#[test]
fn test_write_byte_short_write_changes_nothing() {
    let mut gauge = sealed_gauge();
    let block = BlockId::new(0x51, 0);
    gauge.enter_config_mode().unwrap();
    gauge.transport_mut().faults_mut().short_write_by = 1;

    assert_eq!(
        gauge.write_byte(block, 4, 0x33),
        Err(Error::ShortWrite {
            expected: 3,
            actual: 2,
        })
    );
    assert_eq!(gauge.transport().block(block), [0u8; BLOCK_SIZE]);
}

#[test]
fn test_failed_version_stamp_leaves_chip_unsealed() {
    let mut gauge = sealed_gauge();
    gauge.transport_mut().faults_mut().corrupt_checksum = Some(VERSION_STAMP_BLOCK);

    let seen = checksum(&[0u8; BLOCK_SIZE]).wrapping_add(1);
    assert_eq!(
        gauge.apply_golden_configuration(&[], ConfigVersion::new(5), &mut NoProgress),
        Err(Error::ChecksumMismatch {
            block: VERSION_STAMP_BLOCK,
            expected: updated_checksum(seen, 0x00, 5),
            found: seen,
        })
    );

    let dummy = gauge.transport();
    assert!(!dummy.control_commands().contains(&subcommands::SOFT_RESET));
    assert!(!dummy.control_commands().contains(&subcommands::SEALED));
    assert!(!dummy.is_sealed());
    assert!(dummy.in_cfgupdate());
    assert_eq!(dummy.block(VERSION_STAMP_BLOCK)[3], 0);
}

#[test]
fn test_pack_readback_failure_does_not_stop_apply() {
    let mut gauge = sealed_gauge();
    gauge.transport_mut().faults_mut().nack_select = Some(STATE_BLOCK);

    assert_eq!(
        PackParameters::read(&mut gauge),
        Err(Error::Transport(TransportError::NoAcknowledge))
    );

    gauge
        .apply_golden_configuration(&[], ConfigVersion::new(5), &mut NoProgress)
        .unwrap();

    let dummy = gauge.transport();
    assert_eq!(dummy.block(VERSION_STAMP_BLOCK)[3], 5);
    assert!(dummy.is_sealed());
}

#[test]
fn test_checksum_mismatch_aborts_apply() {
    let mut gauge = sealed_gauge();
    let blocks = &ZEROGRAVITAS.commands[..5];
    let bad = blocks[2];
    gauge.transport_mut().faults_mut().corrupt_checksum = Some(bad.block);

    let err = gauge
        .apply_golden_configuration(blocks, ConfigVersion::new(5), &mut NoProgress)
        .unwrap_err();
    assert_eq!(
        err,
        Error::ChecksumMismatch {
            block: bad.block,
            expected: bad.checksum,
            found: bad.checksum.wrapping_add(1),
        }
    );

    let dummy = gauge.transport();
    // The failing read-back is the last thing that happened
    assert_eq!(
        dummy.transactions().last(),
        Some(&Transaction::Read {
            reg: commands::BLOCK_DATA_CHECKSUM,
            width: fgconf_core::RegisterWidth::Byte,
        })
    );

    // Later blocks never selected, stamp never written
    let fourth = blocks[3].block;
    assert!(!dummy.transactions().iter().any(|t| matches!(
        t,
        Transaction::Write { reg, data }
            if *reg == commands::DATA_CLASS && data[..] == [fourth.class, fourth.index]
    )));
    assert_eq!(dummy.block(BlockId::new(0x40, 0))[3], 0);
    assert!(!dummy.control_commands().contains(&subcommands::SEALED));
}

#[test]
fn test_wrong_device_type_touches_nothing() {
    let config = DummyConfig {
        device_type: 0x0412,
        ..Default::default()
    };
    let mut gauge = Gauge::new(DummyGauge::new(config), DummyClock::new());

    assert_eq!(
        gauge.check_firmware_version(BQ27441_G1),
        Err(Error::HardwareMismatch {
            device_type: 0x0412,
            firmware_version: 0x0109,
        })
    );

    let dummy = gauge.transport();
    assert_eq!(
        dummy.control_commands(),
        [subcommands::DEVICE_TYPE, subcommands::FW_VERSION]
    );
    assert!(dummy
        .transactions()
        .iter()
        .all(|t| !matches!(t, Transaction::Write { .. }) || t.is_write_to(commands::CONTROL)));
}

#[test]
fn test_attach_refuses_wrong_firmware() {
    let config = DummyConfig {
        firmware_version: 0x0108,
        ..Default::default()
    };
    let result = DeviceHandle::attach(
        DummyGauge::new(config),
        DummyClock::new(),
        &AttachOptions::new(ZEROGRAVITAS),
    );

    assert!(matches!(result, Err(e) if e.is_fatal()));
}

#[test]
fn test_register_above_range_never_reaches_bus() {
    let mut gauge = sealed_gauge();
    assert_eq!(gauge.read_reg_byte(0x80), Err(Error::InvalidAddress));
    assert_eq!(gauge.write_reg_byte(0x80, 0), Err(Error::InvalidAddress));
    assert_eq!(gauge.transport().transaction_count(), 0);
}

#[test]
fn test_enter_twice_writes_nothing_the_second_time() {
    let mut gauge = sealed_gauge();
    gauge.enter_config_mode().unwrap();
    gauge.transport_mut().clear_log();

    gauge.enter_config_mode().unwrap();

    let dummy = gauge.transport();
    assert!(dummy
        .transactions()
        .iter()
        .all(|t| matches!(t, Transaction::Read { .. })));
    assert!(dummy.in_cfgupdate());
}

#[test]
fn test_write_byte_then_read_byte_every_offset() {
    let mut gauge = sealed_gauge();
    let block = BlockId::new(0x51, 0);
    gauge.enter_config_mode().unwrap();

    for offset in 0..32u8 {
        let value = offset.wrapping_mul(7).wrapping_add(1);
        gauge.write_byte(block, offset, value).unwrap();
        assert_eq!(gauge.read_byte(block, offset).unwrap(), value);
    }

    let before = gauge.transport().transaction_count();
    assert_eq!(gauge.read_byte(block, 32), Err(Error::InvalidAddress));
    assert_eq!(gauge.transport().transaction_count(), before);
}

#[test]
fn test_full_profile_then_up_to_date() {
    let mut gauge = sealed_gauge();
    let policy = VersionPolicy::default();

    assert!(gauge.needs_configuration(ZEROGRAVITAS.version, policy).unwrap());
    gauge
        .apply_golden_configuration(ZEROGRAVITAS.commands, ZEROGRAVITAS.version, &mut NoProgress)
        .unwrap();
    assert!(!gauge.needs_configuration(ZEROGRAVITAS.version, policy).unwrap());

    assert_eq!(
        PackParameters::read(&mut gauge).unwrap(),
        PackParameters {
            design_capacity_mah: 3000,
            design_energy_mwh: 11100,
            terminate_voltage_mv: 3200,
            taper_rate: 300,
        }
    );
}

#[test]
fn test_chip_that_never_enters_cfgupdate_times_out() {
    let mut gauge = sealed_gauge();
    gauge.transport_mut().faults_mut().never_enter_cfgupdate = true;

    assert_eq!(gauge.enter_config_mode(), Err(Error::Timeout));
    assert!(gauge.clock().now_us() > MODE_TRANSITION_TIMEOUT_US);
    assert_eq!(gauge.mode(), ConfigMode::Unsealing);
}

#[test]
fn test_chip_that_never_leaves_cfgupdate_stays_unsealed() {
    let mut gauge = sealed_gauge();
    gauge.enter_config_mode().unwrap();
    gauge.transport_mut().faults_mut().never_exit_cfgupdate = true;

    assert_eq!(gauge.exit_config_mode(), Err(Error::Timeout));
    assert!(!gauge.transport().is_sealed());
    assert_eq!(gauge.mode(), ConfigMode::Exiting);
}

#[test]
fn test_short_write_is_reported() {
    let mut gauge = sealed_gauge();
    gauge.enter_config_mode().unwrap();
    gauge.transport_mut().faults_mut().short_write_by = 1;

    assert_eq!(
        gauge.write_command(&ZEROGRAVITAS.commands[0]),
        Err(Error::ShortWrite {
            expected: 3,
            actual: 2,
        })
    );
}

#[test]
fn test_attach_configures_once() {
    let options = AttachOptions::new(ZEROGRAVITAS);

    let handle =
        DeviceHandle::attach(DummyGauge::new_default(), DummyClock::new(), &options).unwrap();
    assert!(handle.report().configured);
    let (dummy, clock) = handle.detach();

    let handle = DeviceHandle::attach(dummy, clock, &options).unwrap();
    assert!(!handle.report().configured);
    assert_eq!(handle.report().version_before, ZEROGRAVITAS.version);
    let (mut dummy, clock) = handle.detach();

    // Power-on reset sets ITPOR; whether that triggers depends on policy
    dummy.power_on_reset();
    let only_version = AttachOptions {
        policy: VersionPolicy::VersionOnly,
        ..options.clone()
    };
    let handle = DeviceHandle::attach(dummy, clock, &only_version).unwrap();
    assert!(handle.report().itpor);
    assert!(!handle.report().configured);
    let (dummy, clock) = handle.detach();

    let handle = DeviceHandle::attach(dummy, clock, &options).unwrap();
    assert!(handle.report().configured);
}

#[test]
fn test_gpio_polarity_toggle_round_trip() {
    let handle = DeviceHandle::attach(
        DummyGauge::new_default(),
        DummyClock::new(),
        &AttachOptions::new(ZEROGRAVITAS),
    )
    .unwrap();
    let diag = handle.diagnostics().unwrap();

    // OpConfig from the profile has GPIOPOL clear
    assert!(!diag.gpio_polarity().unwrap());
    assert!(diag.toggle_gpio_polarity().unwrap());
    assert!(diag.gpio_polarity().unwrap());

    assert_eq!(diag.write_control_file(b"1\n"), Ok(2));
    assert!(!diag.gpio_polarity().unwrap());
    assert_eq!(diag.write_control_file(b"0"), Err(Error::InvalidArgument));

    let (dummy, _) = handle.detach();
    assert!(dummy.is_sealed());
    assert_eq!(dummy.block(BlockId::new(0x40, 0))[0], 0x25);
}

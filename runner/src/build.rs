use crate::{
    config::{BuildConfig, Settings},
    pipeline::PipelineError,
    workspace::Workspace,
};
use std::{
    fs::File,
    process::{Command, Stdio},
};
use tracing::{debug, info};

/// Build every distinct config exactly once, in generator order.
///
/// The first nonzero toolchain exit aborts the whole pipeline; later
/// builds are never attempted.
pub fn build_all(
    workspace: &Workspace,
    settings: &Settings,
    builds: &[BuildConfig],
) -> Result<(), PipelineError> {
    workspace.prepare_build()?;

    for build in builds {
        build_one(workspace, settings, build)?;
    }

    Ok(())
}

fn build_one(
    workspace: &Workspace,
    settings: &Settings,
    build: &BuildConfig,
) -> Result<(), PipelineError> {
    info!(
        "Compiling PAYLOAD_SIZE={} MAX_SLOTS_OF_PER_CORE_BUFFER={} NUM_TXS_IN_ONE_EPOCH={} BATCH_CORE_BITMAP_UPDATE={}",
        build.payload,
        build.buffer_slots,
        build.txs_in_epoch,
        u8::from(build.batch_bitmap_update)
    );

    let configure_log = workspace.log_dir().join(build.log_name("configure"));
    let log = File::create(&configure_log)?;
    debug!(log = ?configure_log, "Configuring {}", build.title());

    let status = Command::new(&settings.cmake)
        .current_dir(workspace.build_dir())
        .arg("..")
        .arg("-DLOG_LEVEL=0")
        .arg(format!("-DCMAKE_BUILD_TYPE={}", settings.build_profile))
        .arg("-DBENCHMARK=YCSB")
        .arg(format!("-DCC_ALG={}", build.protocol.to_uppercase()))
        .arg(format!("-DPAYLOAD_SIZE={}", build.payload))
        .arg(format!(
            "-DMAX_SLOTS_OF_PER_CORE_BUFFER={}",
            build.buffer_slots
        ))
        .arg(format!("-DNUM_TXS_IN_ONE_EPOCH={}", build.txs_in_epoch))
        .arg(format!(
            "-DBATCH_CORE_BITMAP_UPDATE={}",
            u8::from(build.batch_bitmap_update)
        ))
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log))
        .status()?;

    if !status.success() {
        return Err(PipelineError::Configure {
            title: build.title(),
            status,
        });
    }

    let compile_log = workspace.log_dir().join(build.log_name("compile"));
    let log = File::create(&compile_log)?;
    debug!(log = ?compile_log, "Compiling {}", build.title());

    let status = Command::new(&settings.make)
        .current_dir(workspace.build_dir())
        .arg("-j")
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log))
        .status()?;

    if !status.success() {
        return Err(PipelineError::Compile {
            title: build.title(),
            status,
        });
    }

    Ok(())
}

//! GPU tests for seg-compute. Skipped at runtime when no adapter is present.

#![cfg(feature = "wgpu")]

use seg_compute::{
    BufferStrategy, ComputeError, ComputeSurface, Connectivity, CpuSurface, EngineConfig, GpuContext,
    KernelModule, KernelParams, LabelEngine, WgpuSurface, verify_fixpoint,
};
use seg_core::GrayImage;

fn gpu_surface() -> Option<WgpuSurface> {
    if !WgpuSurface::is_available() {
        eprintln!("no GPU adapter, skipping");
        return None;
    }
    Some(WgpuSurface::new().unwrap())
}

fn stripes(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| (((x / 3) + (y / 5)) % 3) as u8)
}

#[test]
fn test_kernel_chain_matches_cpu() {
    let Some(gpu) = gpu_surface() else { return };
    let cpu = CpuSurface::new();

    let image = stripes(37, 21);
    let params = KernelParams::new();
    let (w, h) = image.dimensions();

    let g_img = gpu.upload_image(&image, &params).unwrap();
    let mut g_a = gpu.allocate_labels(w, h).unwrap();
    let mut g_b = gpu.allocate_labels(w, h).unwrap();
    let mut g_diff = gpu.allocate_diff(w, h).unwrap();

    let c_img = cpu.upload_image(&image, &params).unwrap();
    let mut c_a = cpu.allocate_labels(w, h).unwrap();
    let mut c_b = cpu.allocate_labels(w, h).unwrap();
    let mut c_diff = cpu.allocate_diff(w, h).unwrap();

    gpu.init_labels(&g_img, &mut g_a).unwrap();
    cpu.init_labels(&c_img, &mut c_a).unwrap();
    assert_eq!(gpu.download_labels(&g_a).unwrap(), cpu.download_labels(&c_a).unwrap());

    gpu.propagate(&g_img, &g_a, &mut g_b).unwrap();
    cpu.propagate(&c_img, &c_a, &mut c_b).unwrap();
    assert_eq!(gpu.download_labels(&g_b).unwrap(), cpu.download_labels(&c_b).unwrap());

    gpu.compare(&g_a, &g_b, &mut g_diff).unwrap();
    cpu.compare(&c_a, &c_b, &mut c_diff).unwrap();
    assert_eq!(gpu.read_diff(&g_diff).unwrap(), cpu.read_diff(&c_diff).unwrap());

    gpu.copy_labels(&g_b, &mut g_a).unwrap();
    assert_eq!(gpu.download_labels(&g_a).unwrap(), gpu.download_labels(&g_b).unwrap());
}

#[test]
fn test_engine_matches_cpu() {
    if !WgpuSurface::is_available() {
        return;
    }

    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let params = KernelParams::new().with_connectivity(connectivity).with_tolerance(1);
        let config = EngineConfig::default().with_params(params);
        let image = stripes(50, 33);

        let expected = LabelEngine::with_config(CpuSurface::new(), config).run(&image).unwrap();
        let mut engine = LabelEngine::with_config(gpu_surface().unwrap(), config);
        let actual = engine.run(&image).unwrap();

        assert_eq!(actual.labels, expected.labels, "{connectivity}");
        assert_eq!(actual.iterations, expected.iterations);
        assert_eq!(actual.backend, "wgpu");
        assert!(verify_fixpoint(&image, &actual.labels, &params));
    }
}

#[test]
fn test_copy_back_strategy() {
    let Some(gpu) = gpu_surface() else { return };
    let image = stripes(17, 40);

    let swap = LabelEngine::new(gpu).run(&image).unwrap();
    let config = EngineConfig::default().with_strategy(BufferStrategy::CopyBack);
    let copy = LabelEngine::with_config(gpu_surface().unwrap(), config).run(&image).unwrap();

    assert_eq!(swap.labels, copy.labels);
}

#[test]
fn test_non_multiple_of_workgroup() {
    let Some(gpu) = gpu_surface() else { return };
    let image = GrayImage::filled(1, 19, 4);
    let result = LabelEngine::new(gpu).run(&image).unwrap();
    assert!(result.labels.as_slice().iter().all(|&l| l == 0));
    assert_eq!(result.iterations, 19);
}

#[test]
fn test_invalid_wgsl_is_compile_error() {
    if !WgpuSurface::is_available() {
        return;
    }
    // Passes the textual contract scan but is not valid WGSL
    let source = format!("{}\nfn broken( {{", KernelModule::builtin().source());
    let module = KernelModule::from_wgsl("broken", source);

    let err = WgpuSurface::with_kernel(GpuContext::new().unwrap(), &module).err().unwrap();
    assert!(matches!(err, ComputeError::KernelCompile(_)), "{err}");
}

#[test]
fn test_entry_using_unlisted_binding_is_contract_error() {
    if !WgpuSurface::is_available() {
        return;
    }
    // Every binding is declared, but init_labels now touches diff, which its
    // layout does not include
    let source = KernelModule::builtin()
        .source()
        .replace("labels_out[idx] = idx;", "labels_out[idx] = idx;\n    diff[idx] = 0u;");
    assert!(source.contains("diff[idx] = 0u;"));
    let module = KernelModule::from_wgsl("leaky_init", source);

    let err = WgpuSurface::with_kernel(GpuContext::new().unwrap(), &module).err().unwrap();
    match err {
        ComputeError::KernelContract { entry_point, .. } => assert_eq!(entry_point, "init_labels"),
        other => panic!("unexpected error: {other}"),
    }
}

//! WGSL source of the bundled label kernels.
//! Used by the wgpu surface; the CPU surface runs `crate::reference`.

/// Label propagation kernel module: `init_labels`, `propagate_min_label`,
/// `compare_grids`. Bindings follow `crate::kernel::KernelInterface::v1`.
pub const LABEL_KERNELS: &str = r#"// seg-kernel-interface: 1

struct Params {
    width: u32,
    height: u32,
    connectivity: u32,
    tolerance: u32,
}

@group(0) @binding(0) var<storage, read> pixels: array<u32>;
@group(0) @binding(1) var<storage, read> labels_in: array<u32>;
@group(0) @binding(2) var<storage, read_write> labels_out: array<u32>;
@group(0) @binding(3) var<storage, read_write> diff: array<u32>;
@group(0) @binding(4) var<uniform> params: Params;

fn same_region(a: u32, b: u32) -> bool {
    let d = select(b - a, a - b, a > b);
    return d <= params.tolerance;
}

@compute @workgroup_size(16, 16, 1)
fn init_labels(@builtin(global_invocation_id) id: vec3<u32>) {
    if id.x >= params.width || id.y >= params.height { return; }
    let idx = id.y * params.width + id.x;
    labels_out[idx] = idx;
}

@compute @workgroup_size(16, 16, 1)
fn propagate_min_label(@builtin(global_invocation_id) id: vec3<u32>) {
    let w = params.width;
    let h = params.height;
    if id.x >= w || id.y >= h { return; }

    let x = i32(id.x);
    let y = i32(id.y);
    let idx = id.y * w + id.x;
    let value = pixels[idx];
    var best = labels_in[idx];

    for (var dy = -1; dy <= 1; dy++) {
        for (var dx = -1; dx <= 1; dx++) {
            if dx == 0 && dy == 0 { continue; }
            if params.connectivity == 4u && dx != 0 && dy != 0 { continue; }
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || ny < 0 || nx >= i32(w) || ny >= i32(h) { continue; }
            let n = u32(ny) * w + u32(nx);
            if same_region(value, pixels[n]) {
                best = min(best, labels_in[n]);
            }
        }
    }

    labels_out[idx] = best;
}

@compute @workgroup_size(16, 16, 1)
fn compare_grids(@builtin(global_invocation_id) id: vec3<u32>) {
    if id.x >= params.width || id.y >= params.height { return; }
    let idx = id.y * params.width + id.x;
    diff[idx] = select(0u, 1u, labels_in[idx] != labels_out[idx]);
}
"#;

/// Workgroup edge length used by every entry point above.
#[cfg(feature = "wgpu")]
pub const WORKGROUP_DIM: u32 = 16;

use crate::screen;

/// Workgroup width for `mandelbrot.wgsl#mandelbrot`.
pub const MANDELBROT_WORKGROUP_SIZE_X: u32 = 8;

/// Workgroup height for `mandelbrot.wgsl#mandelbrot`.
pub const MANDELBROT_WORKGROUP_SIZE_Y: u32 = 8;

/**
Dispatch size for `mandelbrot.wgsl#mandelbrot`

[WGSL compute shader workgroups reference](https://www.w3.org/TR/WGSL/#compute-shader-workgroups)

For a single workgroup, a compute entrypoint with `@workgroup_size(w_x, w_y, w_z)`
is run `w_x * w_y * w_z` times. A call to `dispatch_workgroups(x, y, z)` runs
`x * y * z` workgroups, which runs the entrypoint `x * y * z * w_x * w_y * w_z`
times.

The kernel runs once per raster pixel, indexed by `global_invocation_id.xy`. A
square `8 * 8` workgroup gives 64 invocations, a common warp/wavefront multiple,
and keeps neighbouring pixels (which tend to take similar iteration counts) in
the same workgroup.

The grid is rounded up to whole workgroups, so it can overhang the raster by up
to 7 pixels in each direction. The kernel discards invocations outside the
raster.

Each dimension is limited to
[maxComputeWorkgroupsPerDimension](https://www.w3.org/TR/webgpu/#dom-supported-limits-maxcomputeworkgroupsperdimension),
65535 by default, which allows rasters up to `524280` pixels wide or high.
*/
pub fn mandelbrot_dispatch_size(size: screen::Size) -> (u32, u32, u32) {
    (
        (size.width + MANDELBROT_WORKGROUP_SIZE_X - 1) / MANDELBROT_WORKGROUP_SIZE_X,
        (size.height + MANDELBROT_WORKGROUP_SIZE_Y - 1) / MANDELBROT_WORKGROUP_SIZE_Y,
        1,
    )
}

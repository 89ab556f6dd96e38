//! The built-in operator table.

use crate::{common::*, spec::OperatorSpec};

/// The custom operators of the detection toolbox, in build order.
pub static OPERATORS: Lazy<Vec<OperatorSpec>> = Lazy::new(|| {
    vec![
        OperatorSpec::new_unchecked(
            "compiling_info",
            "mmdet.ops.utils",
            &["src/compiling_info.cpp"],
            &[],
        ),
        OperatorSpec::new_unchecked(
            "nms_ext",
            "mmdet.ops.nms",
            &["src/nms_ext.cpp", "src/cpu/nms_cpu.cpp"],
            &["src/cuda/nms_cuda.cpp", "src/cuda/nms_kernel.cu"],
        ),
        OperatorSpec::new_unchecked(
            "roi_align_ext",
            "mmdet.ops.roi_align",
            &["src/roi_align_ext.cpp", "src/cpu/roi_align_v2.cpp"],
            &[
                "src/cuda/roi_align_kernel.cu",
                "src/cuda/roi_align_kernel_v2.cu",
            ],
        ),
        OperatorSpec::new_unchecked(
            "roi_pool_ext",
            "mmdet.ops.roi_pool",
            &["src/roi_pool_ext.cpp"],
            &["src/cuda/roi_pool_kernel.cu"],
        ),
        OperatorSpec::new_unchecked(
            "deform_conv_ext",
            "mmdet.ops.dcn",
            &["src/deform_conv_ext.cpp"],
            &[
                "src/cuda/deform_conv_cuda.cpp",
                "src/cuda/deform_conv_cuda_kernel.cu",
            ],
        ),
        OperatorSpec::new_unchecked(
            "deform_pool_ext",
            "mmdet.ops.dcn",
            &["src/deform_pool_ext.cpp"],
            &[
                "src/cuda/deform_pool_cuda.cpp",
                "src/cuda/deform_pool_cuda_kernel.cu",
            ],
        ),
        OperatorSpec::new_unchecked(
            "sigmoid_focal_loss_ext",
            "mmdet.ops.sigmoid_focal_loss",
            &["src/sigmoid_focal_loss_ext.cpp"],
            &["src/cuda/sigmoid_focal_loss_cuda.cu"],
        ),
        OperatorSpec::new_unchecked(
            "masked_conv2d_ext",
            "mmdet.ops.masked_conv",
            &["src/masked_conv2d_ext.cpp"],
            &[
                "src/cuda/masked_conv2d_cuda.cpp",
                "src/cuda/masked_conv2d_kernel.cu",
            ],
        ),
        OperatorSpec::new_unchecked(
            "carafe_ext",
            "mmdet.ops.carafe",
            &["src/carafe_ext.cpp"],
            &["src/cuda/carafe_cuda.cpp", "src/cuda/carafe_cuda_kernel.cu"],
        ),
        OperatorSpec::new_unchecked(
            "carafe_naive_ext",
            "mmdet.ops.carafe",
            &["src/carafe_naive_ext.cpp"],
            &[
                "src/cuda/carafe_naive_cuda.cpp",
                "src/cuda/carafe_naive_cuda_kernel.cu",
            ],
        ),
    ]
});

/// Finds an operator by name or qualified name.
pub fn find_operator<'a>(operators: &'a [OperatorSpec], name: &str) -> Option<&'a OperatorSpec> {
    operators
        .iter()
        .find(|spec| spec.name() == name || spec.qualified_name() == name)
}

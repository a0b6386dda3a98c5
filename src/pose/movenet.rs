use anyhow::Context;
use async_trait::async_trait;
use ndarray::Array4;
use opencv::{
    core::{Mat, Scalar, Size, Vec3f, CV_32FC3, CV_8UC3},
    imgproc,
    prelude::*,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use crate::camera::VideoFrame;
use crate::config::{EstimationConfig, ModelConfig};
use crate::error::{FrameError, SessionError};
use crate::session::PoseSourceLoader;

use super::keypoint::{Keypoint, KeypointIndex, Pose};
use super::source::{postprocess, PoseSource};

fn build_session(model_path: &str) -> anyhow::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(model_path)
        .context("failed to load ONNX model")?;
    Ok(session)
}

/// RGB frame to a [1, S, S, 3] f32 tensor (0.0-255.0), bilinear resize
fn preprocess(frame: &VideoFrame, size: i32) -> anyhow::Result<Array4<f32>> {
    let expected = frame.width as usize * frame.height as usize * 3;
    if expected == 0 || frame.data.len() != expected {
        anyhow::bail!(
            "frame {} is {}x{} with {} bytes",
            frame.frame_id,
            frame.width,
            frame.height,
            frame.data.len()
        );
    }

    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height as i32,
        frame.width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(&frame.data);

    let mut resized = Mat::default();
    imgproc::resize(&rgb, &mut resized, Size::new(size, size), 0.0, 0.0, imgproc::INTER_LINEAR)?;

    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, side, side, 3));
    for y in 0..size {
        for x in 0..size {
            let pixel = float_mat.at_2d::<Vec3f>(y, x)?;
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = pixel[c];
            }
        }
    }
    Ok(tensor)
}

/// MoveNet Lightning pose detector (single person).
pub struct MoveNetSource {
    session: Session,
    input_size: i32,
}

impl MoveNetSource {
    pub fn new(model_path: &str, input_size: u32) -> Result<Self, SessionError> {
        let session = build_session(model_path)
            .map_err(|e| SessionError::PoseSourceLoad(format!("{model_path}: {e:#}")))?;

        Ok(Self {
            session,
            input_size: input_size as i32,
        })
    }

    fn infer(&mut self, frame: &VideoFrame) -> anyhow::Result<Pose> {
        let input = Tensor::from_array(preprocess(frame, self.input_size)?)?;
        let outputs = self
            .session
            .run(ort::inputs!["serving_default_input_0" => input])
            .context("inference failed")?;

        // [1, 1, 17, 3] (y, x, confidence), normalized coordinates
        let output: ndarray::ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
            .try_extract_array()
            .context("failed to extract output tensor")?;

        let width = frame.width as f32;
        let height = frame.height as f32;
        let keypoints = KeypointIndex::ALL.map(|part| {
            let i = part.index();
            Keypoint::new(
                part,
                output[[0, 0, i, 1]] * width,
                output[[0, 0, i, 0]] * height,
                output[[0, 0, i, 2]],
            )
        });
        Ok(Pose::scored_by_keypoints(keypoints))
    }
}

#[async_trait]
impl PoseSource for MoveNetSource {
    async fn estimate(
        &mut self,
        frame: &VideoFrame,
        config: &EstimationConfig,
    ) -> Result<Vec<Pose>, FrameError> {
        let pose = tokio::task::block_in_place(|| self.infer(frame))
            .map_err(|e| FrameError::Estimation(format!("{e:#}")))?;
        Ok(postprocess(vec![pose], frame.width, config))
    }
}

/// Loads [`MoveNetSource`] from `ModelConfig::path`.
#[derive(Debug, Clone, Default)]
pub struct MoveNetLoader;

#[async_trait]
impl PoseSourceLoader for MoveNetLoader {
    async fn load(&self, config: &ModelConfig) -> Result<Box<dyn PoseSource>, SessionError> {
        let source =
            tokio::task::block_in_place(|| MoveNetSource::new(&config.path, config.input_size))?;
        log::info!("MoveNet loaded from {}", config.path);
        Ok(Box::new(source))
    }
}

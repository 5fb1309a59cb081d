/// Capture page: grabs the local camera in the browser and pushes a JPEG
/// data URL to `/upload_frame` every 100 ms.
pub const CAMERA_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Camera</title>
</head>
<body>
<h2>Camera</h2>
<video id="video" autoplay playsinline muted width="90%"></video>
<canvas id="canvas" style="display:none"></canvas>
<p id="status">starting camera&hellip;</p>
<script>
const UPLOAD_INTERVAL_MS = 100;
const video = document.getElementById("video");
const canvas = document.getElementById("canvas");
const statusLine = document.getElementById("status");
let inFlight = false;

async function start() {
  try {
    const media = await navigator.mediaDevices.getUserMedia({ video: true, audio: false });
    video.srcObject = media;
    statusLine.textContent = "streaming";
    setInterval(pushFrame, UPLOAD_INTERVAL_MS);
  } catch (err) {
    statusLine.textContent = "camera unavailable: " + err;
  }
}

function pushFrame() {
  if (inFlight || video.videoWidth === 0) {
    return;
  }
  canvas.width = video.videoWidth;
  canvas.height = video.videoHeight;
  canvas.getContext("2d").drawImage(video, 0, 0);
  inFlight = true;
  fetch("/upload_frame", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ frame: canvas.toDataURL("image/jpeg") }),
  })
    .catch((err) => { statusLine.textContent = "upload failed: " + err; })
    .finally(() => { inFlight = false; });
}

start();
</script>
</body>
</html>
"#;

pub const VIEWER_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Viewer</title>
</head>
<body>
<h2>Viewer</h2>
<img src="/stream" width="90%" alt="live camera feed">
</body>
</html>
"#;

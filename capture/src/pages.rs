pub const CAMERA_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Camera</title>
</head>
<body>
<h2>Camera Stream</h2>
<img src="/video_feed" width="90%" alt="live camera feed">
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
<img src="/video_feed" width="90%" alt="live camera feed">
</body>
</html>
"#;

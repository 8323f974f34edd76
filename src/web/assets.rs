pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>fiefdom observer</title>
<style>
  body { font-family: monospace; background: #151515; color: #ddd; margin: 2rem; }
  h1 { font-size: 1.2rem; }
  table { border-collapse: collapse; margin-top: 1rem; }
  td, th { border: 1px solid #444; padding: 0.3rem 0.6rem; text-align: right; }
  th { background: #222; }
  td:first-child, th:first-child { text-align: left; }
  #status { color: #8c8; }
</style>
</head>
<body>
<h1>fiefdom observer</h1>
<div id="status">connecting...</div>
<table id="towns">
  <thead>
    <tr><th>town</th><th>tier</th><th>pop</th><th>gold</th><th>income</th></tr>
  </thead>
  <tbody></tbody>
</table>
<script>
const status = document.getElementById('status');
const tbody = document.querySelector('#towns tbody');
function render(frame) {
  const s = frame.snapshot;
  status.textContent = `tick ${s.tick} | ${s.sim_minutes.toFixed(1)} sim-min | ` +
    `${s.total_population} agents | ${s.parties.length} parties` +
    (frame.completed ? ' | done' : '');
  tbody.innerHTML = '';
  for (const town of s.towns) {
    const row = document.createElement('tr');
    row.innerHTML = `<td>${town.name}</td><td>${town.tier}</td>` +
      `<td>${town.population}</td><td>${town.gold}</td><td>${town.income_total}</td>`;
    tbody.appendChild(row);
  }
}
fetch('/api/state').then(r => r.json()).then(body => {
  if (body.frame) render(body.frame);
});
const source = new EventSource('/api/events');
source.onmessage = event => render(JSON.parse(event.data));
</script>
</body>
</html>
"#;
